use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SprintError;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    PlanningDocs,
    ArchitectureReview,
    StakeholderReview,
    Ticketing,
    Executing,
    Closing,
    Done,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[
            Phase::PlanningDocs,
            Phase::ArchitectureReview,
            Phase::StakeholderReview,
            Phase::Ticketing,
            Phase::Executing,
            Phase::Closing,
            Phase::Done,
        ]
    }

    pub fn initial() -> Phase {
        Phase::PlanningDocs
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Phase> {
        Phase::all().get(self.index() + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::PlanningDocs => "planning-docs",
            Phase::ArchitectureReview => "architecture-review",
            Phase::StakeholderReview => "stakeholder-review",
            Phase::Ticketing => "ticketing",
            Phase::Executing => "executing",
            Phase::Closing => "closing",
            Phase::Done => "done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = SprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| SprintError::InvalidPhase(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// GateName
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateName {
    ArchitectureReview,
    StakeholderApproval,
}

impl GateName {
    pub fn all() -> &'static [GateName] {
        &[GateName::ArchitectureReview, GateName::StakeholderApproval]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GateName::ArchitectureReview => "architecture_review",
            GateName::StakeholderApproval => "stakeholder_approval",
        }
    }
}

impl fmt::Display for GateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GateName {
    type Err = SprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GateName::all()
            .iter()
            .copied()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| SprintError::InvalidGateName(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// GateOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    Passed,
    Failed,
}

impl GateOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            GateOutcome::Passed => "passed",
            GateOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for GateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GateOutcome {
    type Err = SprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passed" => Ok(GateOutcome::Passed),
            "failed" => Ok(GateOutcome::Failed),
            _ => Err(SprintError::InvalidResult(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// TicketStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TicketStatus {
    Todo,
    InProgress,
    Done,
}

impl TicketStatus {
    pub fn all() -> &'static [TicketStatus] {
        &[TicketStatus::Todo, TicketStatus::InProgress, TicketStatus::Done]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Todo => "todo",
            TicketStatus::InProgress => "in-progress",
            TicketStatus::Done => "done",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = SprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TicketStatus::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SprintError::InvalidTicketStatus(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
