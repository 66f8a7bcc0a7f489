use chrono::Utc;
use rusqlite::{params, TransactionBehavior};
use std::str::FromStr;

use crate::error::Result;
use crate::store::{require_sprint, GateRecord, StateStore};
use crate::types::{GateName, GateOutcome};

impl StateStore {
    /// Record the latest outcome of a review gate.
    ///
    /// Gate name and result are validated before the store is opened. The
    /// write is an upsert on `(sprint_id, gate_name)`: a second recording
    /// replaces result, timestamp and notes; no history is kept.
    pub fn record_gate(
        &self,
        sprint_id: &str,
        gate_name: &str,
        result: &str,
        notes: Option<&str>,
    ) -> Result<GateRecord> {
        let gate_name = GateName::from_str(gate_name)?;
        let result = GateOutcome::from_str(result)?;

        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        require_sprint(&tx, sprint_id)?;

        let record = GateRecord {
            gate_name,
            result,
            recorded_at: Utc::now(),
            notes: notes.map(str::to_string),
        };
        tx.execute(
            "INSERT INTO sprint_gates (sprint_id, gate_name, result, recorded_at, notes) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(sprint_id, gate_name) DO UPDATE SET \
                 result = excluded.result, \
                 recorded_at = excluded.recorded_at, \
                 notes = excluded.notes",
            params![
                sprint_id,
                record.gate_name.as_str(),
                record.result.as_str(),
                record.recorded_at,
                record.notes
            ],
        )?;
        tx.commit()?;

        tracing::debug!(sprint = sprint_id, gate = %gate_name, result = %result, "gate recorded");
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
