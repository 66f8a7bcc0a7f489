use crate::cmd::{open_workspace, require_store};
use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use sprint_core::paths::normalize_id;
use std::path::Path;

#[derive(Subcommand)]
pub enum GateSubcommand {
    /// Record the outcome of a review gate (replaces any earlier result)
    Record {
        id: String,
        /// architecture_review or stakeholder_approval
        gate: String,
        /// passed or failed
        result: String,
        /// Free-form reviewer notes
        #[arg(long)]
        notes: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: GateSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        GateSubcommand::Record {
            id,
            gate,
            result,
            notes,
        } => record(root, &id, &gate, &result, notes.as_deref(), json),
    }
}

fn record(
    root: &Path,
    id: &str,
    gate: &str,
    result: &str,
    notes: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let ws = open_workspace(root)?;
    let store = require_store(&ws)?;
    let id = normalize_id(id)?;
    let record = store
        .record_gate(&id, gate, result, notes)
        .with_context(|| format!("failed to record gate '{gate}' for sprint '{id}'"))?;

    if json {
        return print_json(&serde_json::json!({
            "sprint_id": id,
            "gate_name": record.gate_name,
            "result": record.result,
            "recorded_at": record.recorded_at,
            "notes": record.notes,
        }));
    }
    println!("Recorded {} = {} for sprint {id}.", record.gate_name, record.result);
    Ok(())
}
