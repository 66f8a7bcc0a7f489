//! Durable sprint lifecycle state backed by SQLite.
//!
//! # Table design
//!
//! ```text
//! sprints          one row per registered sprint, keyed by its ordinal id
//! sprint_gates     latest result per (sprint_id, gate_name), upserted
//! execution_locks  at most one row: `id` is pinned to 1 by a CHECK constraint
//! ```
//!
//! A `StateStore` holds only the database path. Every operation opens its own
//! connection, lazily creates the schema, runs a single transaction and
//! commits before returning, so no connection outlives a call.
//!
//! Gate recording lives in `gate.rs`, the execution lock in `lock.rs`, and
//! phase advancement in `lifecycle.rs`; all of them extend `StateStore`.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SprintError};
use crate::types::{GateName, GateOutcome, Phase};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sprints (
    id TEXT PRIMARY KEY,
    slug TEXT NOT NULL,
    phase TEXT NOT NULL DEFAULT 'planning-docs',
    branch TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sprint_gates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sprint_id TEXT NOT NULL REFERENCES sprints(id),
    gate_name TEXT NOT NULL,
    result TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    notes TEXT,
    UNIQUE(sprint_id, gate_name)
);

CREATE TABLE IF NOT EXISTS execution_locks (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    sprint_id TEXT NOT NULL REFERENCES sprints(id),
    acquired_at TEXT NOT NULL
);
";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintRecord {
    pub id: String,
    pub slug: String,
    pub phase: Phase,
    pub branch: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateRecord {
    pub gate_name: GateName,
    pub result: GateOutcome,
    pub recorded_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRecord {
    pub sprint_id: String,
    pub acquired_at: DateTime<Utc>,
}

/// Everything the store knows about one sprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintState {
    #[serde(flatten)]
    pub sprint: SprintRecord,
    pub gates: Vec<GateRecord>,
    /// Present only when this sprint holds the execution lock.
    pub lock: Option<LockRecord>,
}

impl SprintState {
    pub fn gate(&self, name: GateName) -> Option<&GateRecord> {
        self.gates.iter().find(|g| g.gate_name == name)
    }

    pub fn holds_lock(&self) -> bool {
        self.lock.is_some()
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn parse_text<T>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T: FromStr<Err = SprintError>,
{
    T::from_str(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn sprint_from_row(row: &Row<'_>) -> rusqlite::Result<SprintRecord> {
    Ok(SprintRecord {
        id: row.get(0)?,
        slug: row.get(1)?,
        phase: parse_text(2, row.get(2)?)?,
        branch: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn gate_from_row(row: &Row<'_>) -> rusqlite::Result<GateRecord> {
    Ok(GateRecord {
        gate_name: parse_text(0, row.get(0)?)?,
        result: parse_text(1, row.get(1)?)?,
        recorded_at: row.get(2)?,
        notes: row.get(3)?,
    })
}

pub(crate) fn load_sprint(conn: &Connection, sprint_id: &str) -> Result<Option<SprintRecord>> {
    Ok(conn
        .query_row(
            "SELECT id, slug, phase, branch, created_at, updated_at FROM sprints WHERE id = ?1",
            params![sprint_id],
            sprint_from_row,
        )
        .optional()?)
}

pub(crate) fn require_sprint(conn: &Connection, sprint_id: &str) -> Result<SprintRecord> {
    load_sprint(conn, sprint_id)?.ok_or_else(|| SprintError::NotRegistered(sprint_id.to_string()))
}

pub(crate) fn load_gates(conn: &Connection, sprint_id: &str) -> Result<Vec<GateRecord>> {
    let mut stmt = conn.prepare(
        "SELECT gate_name, result, recorded_at, notes FROM sprint_gates \
         WHERE sprint_id = ?1 ORDER BY gate_name",
    )?;
    let rows = stmt.query_map(params![sprint_id], gate_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub(crate) fn load_lock(conn: &Connection) -> Result<Option<LockRecord>> {
    Ok(conn
        .query_row(
            "SELECT sprint_id, acquired_at FROM execution_locks WHERE id = 1",
            [],
            |row| {
                Ok(LockRecord {
                    sprint_id: row.get(0)?,
                    acquired_at: row.get(1)?,
                })
            },
        )
        .optional()?)
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Point at a database file. Nothing touches the disk until the first call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the database file has been created yet.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Open a connection with WAL journaling and foreign keys, creating the
    /// file and schema on first use.
    pub(crate) fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let created = !self.exists();
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        if created {
            tracing::debug!(path = %self.path.display(), "created sprint state database");
        }
        Ok(conn)
    }

    /// Create the database file and tables if they do not exist.
    pub fn init(&self) -> Result<()> {
        self.connect().map(|_| ())
    }

    /// Register a sprint at the first phase of the lifecycle.
    pub fn register(&self, sprint_id: &str, slug: &str, branch: Option<&str>) -> Result<SprintRecord> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if load_sprint(&tx, sprint_id)?.is_some() {
            return Err(SprintError::DuplicateSprint(sprint_id.to_string()));
        }

        let now = Utc::now();
        let record = SprintRecord {
            id: sprint_id.to_string(),
            slug: slug.to_string(),
            phase: Phase::initial(),
            branch: branch.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        tx.execute(
            "INSERT INTO sprints (id, slug, phase, branch, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.slug,
                record.phase.as_str(),
                record.branch,
                record.created_at,
                record.updated_at
            ],
        )?;
        tx.commit()?;
        Ok(record)
    }

    /// Phase, gates, and lock status for one sprint.
    pub fn get_state(&self, sprint_id: &str) -> Result<SprintState> {
        let conn = self.connect()?;
        let sprint = require_sprint(&conn, sprint_id)?;
        let gates = load_gates(&conn, sprint_id)?;
        let lock = load_lock(&conn)?.filter(|l| l.sprint_id == sprint_id);
        Ok(SprintState { sprint, gates, lock })
    }

    /// All registered sprints ordered by identifier.
    pub fn list(&self) -> Result<Vec<SprintRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, slug, phase, branch, created_at, updated_at FROM sprints ORDER BY id",
        )?;
        let rows = stmt.query_map([], sprint_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Current phase, or `None` when the database does not exist yet or the
    /// sprint was never registered. Never creates the database file.
    pub fn phase_of(&self, sprint_id: &str) -> Result<Option<Phase>> {
        if !self.exists() {
            return Ok(None);
        }
        let conn = self.connect()?;
        Ok(load_sprint(&conn, sprint_id)?.map(|s| s.phase))
    }

    /// Move a sprint to a new identifier, carrying its gate and lock rows.
    ///
    /// Foreign keys are deferred to commit so the parent key and its
    /// children can change inside the same transaction.
    pub fn rename_sprint(&self, old_id: &str, new_id: &str, new_branch: Option<&str>) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = require_sprint(&tx, old_id)?;
        if load_sprint(&tx, new_id)?.is_some() {
            return Err(SprintError::DuplicateSprint(new_id.to_string()));
        }

        tx.pragma_update(None, "defer_foreign_keys", "ON")?;
        let branch = new_branch.map(str::to_string).or(current.branch);
        tx.execute(
            "UPDATE sprints SET id = ?1, branch = ?2, updated_at = ?3 WHERE id = ?4",
            params![new_id, branch, Utc::now(), old_id],
        )?;
        tx.execute(
            "UPDATE sprint_gates SET sprint_id = ?1 WHERE sprint_id = ?2",
            params![new_id, old_id],
        )?;
        tx.execute(
            "UPDATE execution_locks SET sprint_id = ?1 WHERE sprint_id = ?2",
            params![new_id, old_id],
        )?;
        tx.commit()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
