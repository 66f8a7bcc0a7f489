use chrono::Utc;
use rusqlite::{params, Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SprintError};
use crate::store::{load_gates, load_lock, require_sprint, SprintRecord, StateStore};
use crate::types::{GateName, GateOutcome, Phase};

// ---------------------------------------------------------------------------
// Requirements
// ---------------------------------------------------------------------------

/// What must hold for a sprint to leave a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitRequirement {
    None,
    Gate(GateName),
    ExecutionLock,
    Terminal,
}

pub fn exit_requirement(phase: Phase) -> ExitRequirement {
    match phase {
        Phase::PlanningDocs => ExitRequirement::None,
        Phase::ArchitectureReview => ExitRequirement::Gate(GateName::ArchitectureReview),
        Phase::StakeholderReview => ExitRequirement::Gate(GateName::StakeholderApproval),
        Phase::Ticketing => ExitRequirement::ExecutionLock,
        // Ticket completion and archiving are checked by the callers.
        Phase::Executing | Phase::Closing => ExitRequirement::None,
        Phase::Done => ExitRequirement::Terminal,
    }
}

fn check_exit(conn: &Connection, sprint: &SprintRecord) -> Result<Phase> {
    match exit_requirement(sprint.phase) {
        ExitRequirement::Terminal => return Err(SprintError::AlreadyDone(sprint.id.clone())),
        ExitRequirement::None => {}
        ExitRequirement::Gate(gate) => {
            let passed = load_gates(conn, &sprint.id)?
                .iter()
                .any(|g| g.gate_name == gate && g.result == GateOutcome::Passed);
            if !passed {
                return Err(SprintError::GateNotSatisfied {
                    sprint: sprint.id.clone(),
                    gate: gate.to_string(),
                });
            }
        }
        ExitRequirement::ExecutionLock => {
            let held = load_lock(conn)?.is_some_and(|l| l.sprint_id == sprint.id);
            if !held {
                return Err(SprintError::LockNotHeld(sprint.id.clone()));
            }
        }
    }
    sprint
        .phase
        .next()
        .ok_or_else(|| SprintError::AlreadyDone(sprint.id.clone()))
}

// ---------------------------------------------------------------------------
// PhaseTransition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub sprint_id: String,
    pub old_phase: Phase,
    pub new_phase: Phase,
}

impl StateStore {
    /// Move a sprint exactly one phase forward.
    ///
    /// The requirement check and the phase update share one transaction.
    pub fn advance(&self, sprint_id: &str) -> Result<PhaseTransition> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let sprint = require_sprint(&tx, sprint_id)?;
        let next = check_exit(&tx, &sprint)?;

        tx.execute(
            "UPDATE sprints SET phase = ?1, updated_at = ?2 WHERE id = ?3",
            params![next.as_str(), Utc::now(), sprint_id],
        )?;
        tx.commit()?;

        tracing::info!(sprint = sprint_id, from = %sprint.phase, to = %next, "phase advanced");
        Ok(PhaseTransition {
            sprint_id: sprint_id.to_string(),
            old_phase: sprint.phase,
            new_phase: next,
        })
    }

    /// Advance step by step until `target` is reached.
    ///
    /// Stops at the first unmet requirement; transitions already taken stay
    /// committed. A target behind the current phase is rejected up front.
    pub fn advance_to(&self, sprint_id: &str, target: Phase) -> Result<Vec<PhaseTransition>> {
        let mut phase = self.get_state(sprint_id)?.sprint.phase;
        if target < phase {
            return Err(SprintError::InvalidPhaseTransition {
                from: phase.to_string(),
                to: target.to_string(),
            });
        }

        let mut taken = Vec::new();
        while phase < target {
            let step = self.advance(sprint_id)?;
            phase = step.new_phase;
            taken.push(step);
        }
        Ok(taken)
    }
}

// ---------------------------------------------------------------------------
// Ticket creation gate
// ---------------------------------------------------------------------------

/// Refuse ticket creation for sprints that have not reached `ticketing`.
///
/// `None` for the store means phase gating is disabled. A missing database
/// or an unregistered sprint is also treated as unrestricted, so sprints
/// created before the store existed keep working.
pub fn check_can_create_tickets(store: Option<&StateStore>, sprint_id: &str) -> Result<()> {
    let Some(store) = store else {
        return Ok(());
    };
    match store.phase_of(sprint_id)? {
        Some(phase) if phase < Phase::Ticketing => Err(SprintError::TicketsNotAllowed {
            sprint: sprint_id.to_string(),
            phase: phase.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Refuse to renumber a sprint that has left `planning-docs`.
///
/// Unknown phases (gating off, no database, unregistered sprint) allow it.
pub fn check_can_renumber(store: Option<&StateStore>, sprint_id: &str) -> Result<()> {
    let Some(store) = store else {
        return Ok(());
    };
    match store.phase_of(sprint_id)? {
        Some(phase) if phase != Phase::PlanningDocs => Err(SprintError::UnsafeRenumber {
            sprint: sprint_id.to_string(),
            phase: phase.to_string(),
        }),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
