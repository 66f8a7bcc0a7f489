use crate::cmd::open_workspace;
use crate::output::{print_json, print_side_effect};
use anyhow::Context;
use sprint_core::reconcile::reconcile;
use std::path::Path;

pub fn run(root: &Path, apply: bool, json: bool) -> anyhow::Result<()> {
    let ws = open_workspace(root)?;
    let report = reconcile(&ws, apply).context("failed to reconcile sprints with the state store")?;

    if json {
        return print_json(&report);
    }
    if !report.store_available {
        println!("Phase gating is disabled; there is no state store to reconcile.");
        return Ok(());
    }
    if report.is_clean() {
        println!("Sprint directories and the state store agree.");
        return Ok(());
    }

    for u in &report.unregistered {
        let location = if u.closed { "closed" } else { "active" };
        println!("unregistered: {} ({location}, {})", u.id, u.path.display());
        if let Some(effect) = &u.repair {
            if effect.is_applied() {
                println!("  registered at planning-docs");
            }
            print_side_effect("repair", effect);
        }
    }
    for o in &report.orphaned {
        println!("orphaned:     {} ({}, phase {})", o.id, o.slug, o.phase);
    }
    for m in &report.slug_mismatch {
        println!(
            "slug mismatch: {} directory '{}' vs store '{}'",
            m.id, m.directory_slug, m.store_slug
        );
    }
    if !apply && report.unregistered.iter().any(|u| !u.closed) {
        println!("Run with --apply to register active sprints.");
    }
    Ok(())
}
