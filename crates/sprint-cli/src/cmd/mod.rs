pub mod config;
pub mod gate;
pub mod lock;
pub mod phase;
pub mod repair;
pub mod sprint;
pub mod ticket;

use anyhow::Context;
use sprint_core::store::StateStore;
use sprint_core::workspace::Workspace;
use std::path::Path;

pub fn open_workspace(root: &Path) -> anyhow::Result<Workspace> {
    Workspace::open(root).with_context(|| format!("failed to load workspace at {}", root.display()))
}

/// Store-backed commands cannot run with gating switched off.
pub fn require_store(ws: &Workspace) -> anyhow::Result<&StateStore> {
    ws.store()
        .context("phase gating is disabled (gating.enforce: false in docs/plans/config.yaml)")
}
