use crate::cmd::open_workspace;
use crate::output::{or_dash, print_json, print_side_effect, print_table};
use anyhow::Context;
use clap::Subcommand;
use sprint_core::{renumber, sprint};
use std::path::Path;

#[derive(Subcommand)]
pub enum SprintSubcommand {
    /// Create a sprint after the highest existing id
    Create {
        /// Sprint title
        title: String,
    },
    /// Insert a sprint after AFTER, shifting later sprints up by one
    Insert {
        /// Id of the sprint the new one follows
        after: String,
        /// Sprint title
        title: String,
    },
    /// List active and closed sprints
    List {
        /// Only sprints whose status metadata matches
        #[arg(long)]
        status: Option<String>,
    },
    /// Show a sprint's status, phase, and ticket counts
    Show { id: String },
    /// Close a sprint and move it under sprints/done/
    Close { id: String },
}

pub fn run(root: &Path, subcmd: SprintSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        SprintSubcommand::Create { title } => create(root, &title, json),
        SprintSubcommand::Insert { after, title } => insert(root, &after, &title, json),
        SprintSubcommand::List { status } => list(root, status.as_deref(), json),
        SprintSubcommand::Show { id } => show(root, &id, json),
        SprintSubcommand::Close { id } => close(root, &id, json),
    }
}

// ---------------------------------------------------------------------------
// create / insert
// ---------------------------------------------------------------------------

fn create(root: &Path, title: &str, json: bool) -> anyhow::Result<()> {
    let ws = open_workspace(root)?;
    let created = sprint::create_sprint(&ws, title)
        .with_context(|| format!("failed to create sprint '{title}'"))?;

    if json {
        return print_json(&created);
    }
    println!("Created sprint {}: {}", created.id, created.title);
    println!("  Path:   {}", created.path.display());
    println!("  Branch: {}", created.branch);
    print_side_effect("registration", &created.registration);
    Ok(())
}

fn insert(root: &Path, after: &str, title: &str, json: bool) -> anyhow::Result<()> {
    let ws = open_workspace(root)?;
    let inserted = renumber::insert_sprint(&ws, after, title)
        .with_context(|| format!("failed to insert sprint after '{after}'"))?;

    if json {
        return print_json(&inserted);
    }
    println!(
        "Inserted sprint {}: {}",
        inserted.sprint.id, inserted.sprint.title
    );
    println!("  Path: {}", inserted.sprint.path.display());
    print_side_effect("registration", &inserted.sprint.registration);
    if inserted.renumbered.is_empty() {
        println!("  No sprints renumbered.");
    }
    for r in &inserted.renumbered {
        println!("  Renumbered {} -> {} ({})", r.old_id, r.new_id, r.slug);
        print_side_effect("    store", &r.store);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// list / show
// ---------------------------------------------------------------------------

fn list(root: &Path, status: Option<&str>, json: bool) -> anyhow::Result<()> {
    let ws = open_workspace(root)?;
    let sprints = sprint::list_sprints(&ws, status).context("failed to list sprints")?;

    if json {
        return print_json(&sprints);
    }
    if sprints.is_empty() {
        println!("No sprints.");
        return Ok(());
    }

    let rows = sprints
        .iter()
        .map(|s| {
            vec![
                s.id.clone(),
                s.title.clone(),
                or_dash(s.status.as_deref()),
                if s.closed { "closed" } else { "active" }.to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "TITLE", "STATUS", "LOCATION"], rows);
    Ok(())
}

fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let ws = open_workspace(root)?;
    let status = sprint::sprint_status(&ws, id).with_context(|| format!("sprint '{id}'"))?;

    if json {
        return print_json(&status);
    }
    println!("Sprint {}: {}", status.id, status.title);
    println!("Status:  {}", or_dash(status.status.as_deref()));
    println!(
        "Phase:   {}",
        status
            .phase
            .map(|p| p.to_string())
            .unwrap_or_else(|| "(untracked)".to_string())
    );
    println!("Path:    {}", status.path.display());
    println!(
        "Tickets: {} todo, {} in-progress, {} done",
        status.tickets.todo, status.tickets.in_progress, status.tickets.done
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// close
// ---------------------------------------------------------------------------

fn close(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let ws = open_workspace(root)?;
    let closed = sprint::close_sprint(&ws, id).with_context(|| format!("failed to close sprint '{id}'"))?;

    if json {
        return print_json(&closed);
    }
    println!("Closed sprint {}.", closed.id);
    println!("  Moved to: {}", closed.new_path.display());
    print_side_effect("phase", &closed.phase);
    print_side_effect("lock", &closed.lock);
    print_side_effect("release", &closed.release);
    print_side_effect("version file", &closed.version_file);
    if let Some(version) = &closed.version {
        println!("  Tagged v{version}");
    }
    Ok(())
}
