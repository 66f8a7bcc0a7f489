use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a best-effort step that must not abort the operation it
/// belongs to, such as mirroring a filesystem change into the state store.
///
/// Failures are reported and logged instead of propagated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SideEffect {
    Applied,
    Skipped { reason: String },
    Failed { error: String },
}

impl SideEffect {
    pub fn skipped(reason: impl Into<String>) -> Self {
        SideEffect::Skipped {
            reason: reason.into(),
        }
    }

    /// Fold a fallible step into a `SideEffect`, logging failures under `what`.
    pub fn from_result<T, E: fmt::Display>(what: &str, result: Result<T, E>) -> Self {
        match result {
            Ok(_) => SideEffect::Applied,
            Err(e) => {
                tracing::warn!(step = what, error = %e, "best-effort step failed");
                SideEffect::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, SideEffect::Applied)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SideEffect::Failed { .. })
    }
}

impl fmt::Display for SideEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideEffect::Applied => f.write_str("applied"),
            SideEffect::Skipped { reason } => write!(f, "skipped ({reason})"),
            SideEffect::Failed { error } => write!(f, "failed ({error})"),
        }
    }
}
