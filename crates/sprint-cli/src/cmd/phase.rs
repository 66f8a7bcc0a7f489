use crate::cmd::{open_workspace, require_store};
use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use sprint_core::paths::normalize_id;
use sprint_core::types::Phase;
use std::path::Path;

#[derive(Subcommand)]
pub enum PhaseSubcommand {
    /// Move a sprint forward one phase, or step by step up to --to
    Advance {
        id: String,
        /// Target phase (e.g. ticketing, done)
        #[arg(long)]
        to: Option<Phase>,
    },
    /// Show phase, gates, and lock status for a sprint
    Show { id: String },
}

pub fn run(root: &Path, subcmd: PhaseSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        PhaseSubcommand::Advance { id, to } => advance(root, &id, to, json),
        PhaseSubcommand::Show { id } => show(root, &id, json),
    }
}

fn advance(root: &Path, id: &str, to: Option<Phase>, json: bool) -> anyhow::Result<()> {
    let ws = open_workspace(root)?;
    let store = require_store(&ws)?;
    let id = normalize_id(id)?;

    let steps = match to {
        Some(target) => store.advance_to(&id, target),
        None => store.advance(&id).map(|t| vec![t]),
    }
    .with_context(|| format!("failed to advance sprint '{id}'"))?;

    if json {
        return print_json(&steps);
    }
    if steps.is_empty() {
        println!("Sprint {id} is already at the requested phase.");
    }
    for t in &steps {
        println!("Sprint {}: {} -> {}", t.sprint_id, t.old_phase, t.new_phase);
    }
    Ok(())
}

fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let ws = open_workspace(root)?;
    let store = require_store(&ws)?;
    let id = normalize_id(id)?;
    let state = store.get_state(&id).with_context(|| format!("sprint '{id}'"))?;

    if json {
        return print_json(&state);
    }
    println!("Sprint {} ({})", state.sprint.id, state.sprint.slug);
    println!("Phase:  {}", state.sprint.phase);
    if let Some(branch) = &state.sprint.branch {
        println!("Branch: {branch}");
    }
    if state.gates.is_empty() {
        println!("Gates:  (none)");
    } else {
        println!("Gates:");
        for g in &state.gates {
            let notes = g.notes.as_deref().map(|n| format!(" - {n}")).unwrap_or_default();
            println!(
                "  {:<22} {:<7} {}{notes}",
                g.gate_name.as_str(),
                g.result.as_str(),
                g.recorded_at.format("%Y-%m-%d %H:%M"),
            );
        }
    }
    match &state.lock {
        Some(lock) => println!("Lock:   held since {}", lock.acquired_at),
        None => println!("Lock:   not held"),
    }
    Ok(())
}
