use crate::cmd::open_workspace;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use sprint_core::ticket;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum TicketSubcommand {
    /// Create a ticket in a sprint that has reached the ticketing phase
    Create {
        /// Sprint id
        sprint: String,
        /// Ticket title
        title: String,
    },
    /// List tickets across sprints
    List {
        /// Only tickets of this sprint
        #[arg(long)]
        sprint: Option<String>,
        /// Only tickets with this status (todo, in-progress, done)
        #[arg(long)]
        status: Option<String>,
    },
    /// Set a ticket's status
    Status {
        /// Path to the ticket file
        path: PathBuf,
        /// todo, in-progress, or done
        status: String,
    },
    /// Move a ticket (and its plan) into tickets/done/
    Done {
        /// Path to the ticket file
        path: PathBuf,
    },
}

pub fn run(root: &Path, subcmd: TicketSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TicketSubcommand::Create { sprint, title } => create(root, &sprint, &title, json),
        TicketSubcommand::List { sprint, status } => {
            list(root, sprint.as_deref(), status.as_deref(), json)
        }
        TicketSubcommand::Status { path, status } => set_status(root, &path, &status, json),
        TicketSubcommand::Done { path } => done(root, &path, json),
    }
}

/// Ticket paths are taken relative to the project root unless absolute.
fn ticket_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn create(root: &Path, sprint: &str, title: &str, json: bool) -> anyhow::Result<()> {
    let ws = open_workspace(root)?;
    let created = ticket::create_ticket(&ws, sprint, title)
        .with_context(|| format!("failed to create ticket in sprint '{sprint}'"))?;

    if json {
        return print_json(&created);
    }
    println!("Created ticket {} in sprint {}: {}", created.id, created.sprint_id, created.title);
    println!("  Path: {}", created.path.display());
    Ok(())
}

fn list(root: &Path, sprint: Option<&str>, status: Option<&str>, json: bool) -> anyhow::Result<()> {
    let ws = open_workspace(root)?;
    let tickets = ticket::list_tickets(&ws, sprint, status).context("failed to list tickets")?;

    if json {
        return print_json(&tickets);
    }
    if tickets.is_empty() {
        println!("No tickets.");
        return Ok(());
    }
    let rows = tickets
        .iter()
        .map(|t| vec![t.sprint_id.clone(), t.id.clone(), t.status.clone(), t.title.clone()])
        .collect();
    print_table(&["SPRINT", "ID", "STATUS", "TITLE"], rows);
    Ok(())
}

fn set_status(root: &Path, path: &Path, status: &str, json: bool) -> anyhow::Result<()> {
    let path = ticket_path(root, path);
    let change = ticket::update_ticket_status(&path, status)
        .with_context(|| format!("failed to update {}", path.display()))?;

    if json {
        return print_json(&change);
    }
    println!(
        "{}: {} -> {}",
        change.path.display(),
        change.old_status.as_deref().unwrap_or("(none)"),
        change.new_status
    );
    Ok(())
}

fn done(root: &Path, path: &Path, json: bool) -> anyhow::Result<()> {
    let path = ticket_path(root, path);
    let moved = ticket::move_ticket_to_done(&path)
        .with_context(|| format!("failed to complete {}", path.display()))?;

    if json {
        return print_json(&moved);
    }
    println!("Moved {} -> {}", moved.old_path.display(), moved.new_path.display());
    if let Some(plan) = &moved.plan_new_path {
        println!("  Plan: {}", plan.display());
    }
    Ok(())
}
