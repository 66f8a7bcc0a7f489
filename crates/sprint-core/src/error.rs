use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SprintError {
    #[error("sprint '{0}' is not registered")]
    NotRegistered(String),

    #[error("sprint '{0}' not found")]
    NotFound(String),

    #[error("sprint '{0}' is already registered")]
    DuplicateSprint(String),

    #[error("sprint '{0}' is already done")]
    AlreadyDone(String),

    #[error("gate '{gate}' has not passed for sprint '{sprint}'")]
    GateNotSatisfied { sprint: String, gate: String },

    #[error("sprint '{0}' must hold the execution lock to leave the ticketing phase")]
    LockNotHeld(String),

    #[error("execution lock is held by sprint '{holder}' (acquired at {acquired_at})")]
    LockHeld {
        holder: String,
        acquired_at: DateTime<Utc>,
    },

    #[error("no execution lock is held")]
    NoLockHeld,

    #[error("sprint '{sprint}' does not hold the execution lock (held by '{holder}')")]
    WrongHolder { sprint: String, holder: String },

    #[error("invalid gate name '{0}': expected architecture_review or stakeholder_approval")]
    InvalidGateName(String),

    #[error("invalid result '{0}': expected passed or failed")]
    InvalidResult(String),

    #[error("invalid phase: {0}")]
    InvalidPhase(String),

    #[error("invalid phase transition from {from} to {to}")]
    InvalidPhaseTransition { from: String, to: String },

    #[error(
        "sprint '{sprint}' is in phase '{phase}' and cannot be renumbered; \
         only sprints in planning-docs can be shifted"
    )]
    UnsafeRenumber { sprint: String, phase: String },

    #[error(
        "sprint '{sprint}' is in the '{phase}' phase; tickets can only be created \
         in the ticketing phase or later"
    )]
    TicketsNotAllowed { sprint: String, phase: String },

    #[error("invalid ticket status '{0}': expected todo, in-progress or done")]
    InvalidTicketStatus(String),

    #[error("invalid sprint id '{0}': expected a numeric identifier")]
    InvalidSprintId(String),

    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("git: {0}")]
    Git(String),

    #[error("no version field in {0}")]
    MissingVersionField(String),

    #[error("{}: {source}", .path.display())]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("state store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SprintError>;
