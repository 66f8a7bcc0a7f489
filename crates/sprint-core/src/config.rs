use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// GatingConfig
// ---------------------------------------------------------------------------

/// Whether phase gating runs against the state store at all.
///
/// With `enforce: false` the workspace carries no store capability and every
/// phase check (ticket creation, renumbering safety) allows the operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatingConfig {
    #[serde(default = "default_enforce")]
    pub enforce: bool,
}

fn default_enforce() -> bool {
    true
}

impl Default for GatingConfig {
    fn default() -> Self {
        Self {
            enforce: default_enforce(),
        }
    }
}

// ---------------------------------------------------------------------------
// ReleaseConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseConfig {
    #[serde(default)]
    pub tag_on_close: bool,
    #[serde(default)]
    pub major: u32,
    /// Stamp the tagged version into `pyproject.toml` or `package.json`.
    #[serde(default)]
    pub bump_version_file: bool,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub gating: GatingConfig,
    #[serde(default = "default_state_db")]
    pub state_db: String,
    #[serde(default)]
    pub release: ReleaseConfig,
}

fn default_version() -> u32 {
    1
}

fn default_state_db() -> String {
    paths::STATE_DB_FILE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            gating: GatingConfig::default(),
            state_db: default_state_db(),
            release: ReleaseConfig::default(),
        }
    }
}

impl Config {
    /// Load `docs/plans/config.yaml`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Resolve the state database location against the project root.
    pub fn state_db_path(&self, root: &Path) -> PathBuf {
        let configured = Path::new(&self.state_db);
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            root.join(configured)
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.state_db.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "state_db is empty".to_string(),
            });
        }

        if !self.gating.enforce {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "gating.enforce is false: phase checks are skipped and the \
                          state store is not updated"
                    .to_string(),
            });
        }

        if self.release.tag_on_close && which::which("git").is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "release.tag_on_close is set but git is not on PATH".to_string(),
            });
        }

        if self.release.bump_version_file && !self.release.tag_on_close {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "release.bump_version_file has no effect unless release.tag_on_close is set"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
