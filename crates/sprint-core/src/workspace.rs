//! The project a command operates on.
//!
//! A `Workspace` bundles the project root, its loaded configuration and the
//! state-store capability. Operations that gate on lifecycle state take the
//! store as `Option<&StateStore>`: `None` means gating is switched off and
//! every phase check passes.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::paths;
use crate::store::StateStore;

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    config: Config,
    store: Option<StateStore>,
}

impl Workspace {
    /// Load config from `root` and wire up the state store it names.
    pub fn open(root: &Path) -> Result<Self> {
        let config = Config::load(root)?;
        Ok(Self::with_config(root, config))
    }

    pub fn with_config(root: &Path, config: Config) -> Self {
        let store = config
            .gating
            .enforce
            .then(|| StateStore::new(config.state_db_path(root)));
        Self {
            root: root.to_path_buf(),
            config,
            store,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The state store, or `None` when gating is disabled.
    pub fn store(&self) -> Option<&StateStore> {
        self.store.as_ref()
    }

    pub fn sprints_dir(&self) -> PathBuf {
        paths::sprints_dir(&self.root)
    }

    pub fn closed_sprints_dir(&self) -> PathBuf {
        paths::closed_sprints_dir(&self.root)
    }
}
