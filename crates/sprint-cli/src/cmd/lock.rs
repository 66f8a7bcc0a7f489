use crate::cmd::{open_workspace, require_store};
use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use sprint_core::paths::normalize_id;
use std::path::Path;

#[derive(Subcommand)]
pub enum LockSubcommand {
    /// Take the execution lock for a sprint
    Acquire { id: String },
    /// Release the execution lock held by a sprint
    Release { id: String },
    /// Show which sprint holds the execution lock
    Holder,
}

pub fn run(root: &Path, subcmd: LockSubcommand, json: bool) -> anyhow::Result<()> {
    let ws = open_workspace(root)?;
    let store = require_store(&ws)?;

    match subcmd {
        LockSubcommand::Acquire { id } => {
            let id = normalize_id(&id)?;
            let acq = store
                .acquire_lock(&id)
                .with_context(|| format!("sprint '{id}' could not acquire the execution lock"))?;
            if json {
                return print_json(&acq);
            }
            if acq.reentrant {
                println!("Sprint {id} already holds the execution lock.");
            } else {
                println!("Sprint {id} acquired the execution lock.");
            }
        }
        LockSubcommand::Release { id } => {
            let id = normalize_id(&id)?;
            let released = store
                .release_lock(&id)
                .with_context(|| format!("sprint '{id}' could not release the execution lock"))?;
            if json {
                return print_json(&released);
            }
            println!("Sprint {id} released the execution lock.");
        }
        LockSubcommand::Holder => {
            let holder = store.lock_holder().context("failed to read the execution lock")?;
            if json {
                return print_json(&holder);
            }
            match holder {
                Some(lock) => println!(
                    "Held by sprint {} since {}.",
                    lock.sprint_id, lock.acquired_at
                ),
                None => println!("No execution lock is held."),
            }
        }
    }
    Ok(())
}
