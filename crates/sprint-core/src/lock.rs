//! The execution lock: one row, system-wide.
//!
//! The lock is advisory. Only the ticketing → executing transition in
//! `lifecycle.rs` consults it; everything else must choose to honor it.

use chrono::Utc;
use rusqlite::{params, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SprintError};
use crate::store::{load_lock, require_sprint, LockRecord, StateStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockAcquisition {
    #[serde(flatten)]
    pub lock: LockRecord,
    /// `true` when the sprint already held the lock.
    pub reentrant: bool,
}

impl StateStore {
    /// Take the execution lock for `sprint_id`.
    ///
    /// Re-acquiring by the current holder succeeds and leaves the original
    /// acquisition time untouched.
    pub fn acquire_lock(&self, sprint_id: &str) -> Result<LockAcquisition> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        require_sprint(&tx, sprint_id)?;

        if let Some(existing) = load_lock(&tx)? {
            if existing.sprint_id == sprint_id {
                return Ok(LockAcquisition {
                    lock: existing,
                    reentrant: true,
                });
            }
            return Err(SprintError::LockHeld {
                holder: existing.sprint_id,
                acquired_at: existing.acquired_at,
            });
        }

        let lock = LockRecord {
            sprint_id: sprint_id.to_string(),
            acquired_at: Utc::now(),
        };
        tx.execute(
            "INSERT INTO execution_locks (id, sprint_id, acquired_at) VALUES (1, ?1, ?2)",
            params![lock.sprint_id, lock.acquired_at],
        )?;
        tx.commit()?;

        tracing::info!(sprint = sprint_id, "execution lock acquired");
        Ok(LockAcquisition {
            lock,
            reentrant: false,
        })
    }

    /// Release the execution lock held by `sprint_id`.
    pub fn release_lock(&self, sprint_id: &str) -> Result<LockRecord> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing = load_lock(&tx)?.ok_or(SprintError::NoLockHeld)?;
        if existing.sprint_id != sprint_id {
            return Err(SprintError::WrongHolder {
                sprint: sprint_id.to_string(),
                holder: existing.sprint_id,
            });
        }
        tx.execute("DELETE FROM execution_locks WHERE id = 1", [])?;
        tx.commit()?;

        tracing::info!(sprint = sprint_id, "execution lock released");
        Ok(existing)
    }

    /// Current lock holder, if any.
    pub fn lock_holder(&self) -> Result<Option<LockRecord>> {
        let conn = self.connect()?;
        load_lock(&conn)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
