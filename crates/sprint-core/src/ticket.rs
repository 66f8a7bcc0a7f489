//! Ticket documents inside a sprint's `tickets/` directory.
//!
//! A ticket is `tickets/<NNN>-<slug>.md`, with an optional companion plan
//! `<NNN>-<slug>-plan.md` that travels with it. Completed tickets live in
//! `tickets/done/`; ticket ids are allocated across both directories.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, SprintError};
use crate::frontmatter::Document;
use crate::io::ensure_dir;
use crate::lifecycle::check_can_create_tickets;
use crate::paths;
use crate::sprint;
use crate::types::TicketStatus;
use crate::workspace::Workspace;

const PLAN_SUFFIX: &str = "-plan.md";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketInfo {
    pub id: String,
    pub title: String,
    /// Raw `status` metadata; hand-edited files may hold anything.
    pub status: String,
    pub sprint_id: String,
    pub path: PathBuf,
    pub done: bool,
}

fn is_ticket_file(name: &str) -> bool {
    name.ends_with(".md") && !name.ends_with(PLAN_SUFFIX)
}

fn scan(dir: &Path, sprint_id: &str, done: bool) -> Result<Vec<TicketInfo>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut tickets = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !entry.file_type()?.is_file() || !is_ticket_file(&name) {
            continue;
        }
        let stem = name.trim_end_matches(".md");
        let Some((ordinal, slug)) = paths::split_ordinal_name(stem) else {
            continue;
        };
        let doc = Document::read(&entry.path())?;
        tickets.push(TicketInfo {
            id: doc.get_str("id").unwrap_or(ordinal),
            title: doc.get_str("title").unwrap_or(slug),
            status: doc.get_str("status").unwrap_or_else(|| TicketStatus::Todo.to_string()),
            sprint_id: sprint_id.to_string(),
            path: entry.path(),
            done,
        });
    }
    tickets.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(tickets)
}

/// Open then completed tickets of one sprint directory.
pub fn sprint_tickets(sprint_dir: &Path, sprint_id: &str) -> Result<Vec<TicketInfo>> {
    let tdir = paths::tickets_dir(sprint_dir);
    let mut tickets = scan(&tdir, sprint_id, false)?;
    tickets.extend(scan(&tdir.join(paths::DONE_DIR), sprint_id, true)?);
    Ok(tickets)
}

/// Next free ticket ordinal across `tickets/` and `tickets/done/`.
pub fn next_ticket_id(sprint_dir: &Path) -> Result<String> {
    let tdir = paths::tickets_dir(sprint_dir);
    let mut max = 0u32;
    for dir in [tdir.clone(), tdir.join(paths::DONE_DIR)] {
        if !dir.is_dir() {
            continue;
        }
        for entry in std::fs::read_dir(&dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if !is_ticket_file(&name) {
                continue;
            }
            if let Some((ordinal, _)) = paths::split_ordinal_name(name.trim_end_matches(".md")) {
                if let Ok(n) = paths::parse_id(&ordinal) {
                    max = max.max(n);
                }
            }
        }
    }
    paths::successor_id(max)
}

// ---------------------------------------------------------------------------
// create / list
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedTicket {
    pub id: String,
    pub title: String,
    pub sprint_id: String,
    pub path: PathBuf,
}

fn ticket_document(id: &str, title: &str, sprint_id: &str) -> Document {
    let mut doc = Document::default();
    doc.set("id", id);
    doc.set("title", title);
    doc.set("status", TicketStatus::Todo.as_str());
    doc.set("sprint-id", sprint_id);
    doc.set_list("use-cases", &[]);
    doc.set_list("depends-on", &[]);
    doc.body = format!(
        "\n# {title}\n\
         \n## Description\n\n(What needs to be done and why.)\n\
         \n## Acceptance Criteria\n\n- [ ] (Criterion)\n"
    );
    doc
}

/// Create a ticket in an active sprint that has reached `ticketing`.
pub fn create_ticket(ws: &Workspace, sprint_id: &str, title: &str) -> Result<CreatedTicket> {
    let sprint = sprint::find_active_sprint(ws, sprint_id)?;
    check_can_create_tickets(ws.store(), &sprint.id)?;

    let tdir = sprint.tickets_dir();
    ensure_dir(&tdir.join(paths::DONE_DIR))?;
    let id = next_ticket_id(&sprint.path)?;
    let path = tdir.join(format!("{id}-{}.md", paths::slugify(title)));
    ticket_document(&id, title, &sprint.id).write(&path)?;

    tracing::info!(sprint = %sprint.id, ticket = %id, "ticket created");
    Ok(CreatedTicket {
        id,
        title: title.to_string(),
        sprint_id: sprint.id,
        path,
    })
}

pub fn list_tickets(
    ws: &Workspace,
    sprint_id: Option<&str>,
    status: Option<&str>,
) -> Result<Vec<TicketInfo>> {
    let sprints = match sprint_id {
        Some(id) => vec![sprint::find_sprint(ws, id)?],
        None => sprint::list_sprints(ws, None)?,
    };
    let mut tickets = Vec::new();
    for s in &sprints {
        tickets.extend(sprint_tickets(&s.path, &s.id)?);
    }
    if let Some(status) = status {
        tickets.retain(|t| t.status == status);
    }
    Ok(tickets)
}

// ---------------------------------------------------------------------------
// status / move
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub path: PathBuf,
    pub old_status: Option<String>,
    pub new_status: TicketStatus,
}

pub fn update_ticket_status(path: &Path, status: &str) -> Result<StatusChange> {
    let new_status = TicketStatus::from_str(status)?;
    let path = resolve_artifact_path(path)?;
    let mut doc = Document::read(&path)?;
    let old_status = doc.get_str("status");
    doc.set("status", new_status.as_str());
    doc.write(&path)?;
    Ok(StatusChange {
        path,
        old_status,
        new_status,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovedTicket {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_old_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_new_path: Option<PathBuf>,
}

fn plan_path_for(ticket: &Path) -> Option<PathBuf> {
    let stem = ticket.file_stem()?.to_string_lossy();
    Some(ticket.with_file_name(format!("{stem}{PLAN_SUFFIX}")))
}

/// Mark a ticket done and move it, with its plan, into `tickets/done/`.
pub fn move_ticket_to_done(path: &Path) -> Result<MovedTicket> {
    let path = resolve_artifact_path(path)?;
    let parent = path
        .parent()
        .ok_or_else(|| SprintError::ArtifactNotFound(path.display().to_string()))?;
    let done_dir = if parent.file_name().is_some_and(|n| n == paths::DONE_DIR) {
        parent.to_path_buf()
    } else {
        parent.join(paths::DONE_DIR)
    };
    ensure_dir(&done_dir)?;

    let mut doc = Document::read(&path)?;
    doc.set("status", TicketStatus::Done.as_str());
    doc.write(&path)?;

    let file_name = path.file_name().unwrap_or_default();
    let new_path = done_dir.join(file_name);
    if new_path != path {
        std::fs::rename(&path, &new_path)?;
    }

    let (plan_old_path, plan_new_path) = match plan_path_for(&path) {
        Some(plan) if plan.is_file() => {
            let target = done_dir.join(plan.file_name().unwrap_or_default());
            if target != plan {
                std::fs::rename(&plan, &target)?;
            }
            (Some(plan), Some(target))
        }
        _ => (None, None),
    };

    Ok(MovedTicket {
        old_path: path,
        new_path,
        plan_old_path,
        plan_new_path,
    })
}

// ---------------------------------------------------------------------------
// Artifact path resolution
// ---------------------------------------------------------------------------

/// Find an artifact that may have moved in or out of a `done/` directory.
///
/// Tries the path as given, then the same file inside a sibling `done/`,
/// then the path with its last `done` component removed.
pub fn resolve_artifact_path(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }

    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        let in_done = parent.join(paths::DONE_DIR).join(name);
        if in_done.exists() {
            return Ok(in_done);
        }
    }

    let components: Vec<Component<'_>> = path.components().collect();
    if let Some(pos) = components
        .iter()
        .rposition(|c| c.as_os_str() == paths::DONE_DIR)
    {
        let stripped: PathBuf = components
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != pos)
            .map(|(_, c)| c.as_os_str())
            .collect();
        if stripped.exists() {
            return Ok(stripped);
        }
    }

    Err(SprintError::ArtifactNotFound(path.display().to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprint::create_sprint;
    use tempfile::TempDir;

    fn ticketing_workspace(dir: &TempDir) -> Workspace {
        let ws = Workspace::open(dir.path()).unwrap();
        create_sprint(&ws, "Sprint").unwrap();
        let store = ws.store().unwrap();
        store.advance("001").unwrap();
        store.record_gate("001", "architecture_review", "passed", None).unwrap();
        store.advance("001").unwrap();
        store.record_gate("001", "stakeholder_approval", "passed", None).unwrap();
        store.advance("001").unwrap();
        ws
    }

    #[test]
    fn creates_ticket_with_metadata() {
        let dir = TempDir::new().unwrap();
        let ws = ticketing_workspace(&dir);
        let t = create_ticket(&ws, "001", "Add Feature").unwrap();
        assert_eq!(t.id, "001");
        assert!(t.path.ends_with("tickets/001-add-feature.md"));

        let doc = Document::read(&t.path).unwrap();
        assert_eq!(doc.get_str("status").as_deref(), Some("todo"));
        assert_eq!(doc.get_str("sprint-id").as_deref(), Some("001"));
        assert!(doc.body.contains("# Add Feature"));
    }

    #[test]
    fn ticket_ids_increment_across_done() {
        let dir = TempDir::new().unwrap();
        let ws = ticketing_workspace(&dir);
        let first = create_ticket(&ws, "001", "First").unwrap();
        move_ticket_to_done(&first.path).unwrap();
        assert_eq!(create_ticket(&ws, "001", "Second").unwrap().id, "002");
    }

    #[test]
    fn unknown_sprint_is_not_found() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        let err = create_ticket(&ws, "999", "Orphan").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn blocked_before_ticketing_phase() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        create_sprint(&ws, "My Sprint").unwrap();
        let err = create_ticket(&ws, "001", "Too Early").unwrap_err();
        assert!(matches!(err, SprintError::TicketsNotAllowed { .. }));
        assert!(err.to_string().contains("planning-docs"));
    }

    #[test]
    fn list_filters_by_sprint_and_status() {
        let dir = TempDir::new().unwrap();
        let ws = ticketing_workspace(&dir);
        let a = create_ticket(&ws, "001", "A").unwrap();
        create_ticket(&ws, "001", "B").unwrap();
        update_ticket_status(&a.path, "in-progress").unwrap();

        assert_eq!(list_tickets(&ws, None, None).unwrap().len(), 2);
        let in_progress = list_tickets(&ws, Some("001"), Some("in-progress")).unwrap();
        assert_eq!(in_progress.len(), 1);
        assert_eq!(in_progress[0].sprint_id, "001");
        assert!(list_tickets(&ws, None, Some("done")).unwrap().is_empty());
    }

    #[test]
    fn update_status_reports_old_and_new() {
        let dir = TempDir::new().unwrap();
        let ws = ticketing_workspace(&dir);
        let t = create_ticket(&ws, "001", "Task").unwrap();
        let change = update_ticket_status(&t.path, "in-progress").unwrap();
        assert_eq!(change.old_status.as_deref(), Some("todo"));
        assert_eq!(change.new_status, TicketStatus::InProgress);

        let err = update_ticket_status(&t.path, "invalid").unwrap_err();
        assert!(matches!(err, SprintError::InvalidTicketStatus(_)));
    }

    #[test]
    fn move_to_done_carries_plan() {
        let dir = TempDir::new().unwrap();
        let ws = ticketing_workspace(&dir);
        let t = create_ticket(&ws, "001", "Task").unwrap();
        let plan = t.path.with_file_name("001-task-plan.md");
        std::fs::write(&plan, "# Plan\n").unwrap();

        let moved = move_ticket_to_done(&t.path).unwrap();
        assert!(!moved.old_path.exists());
        assert!(moved.new_path.exists());
        assert!(moved.new_path.parent().unwrap().ends_with("tickets/done"));
        assert!(!plan.exists());
        assert!(moved.plan_new_path.unwrap().is_file());

        let doc = Document::read(&moved.new_path).unwrap();
        assert_eq!(doc.get_str("status").as_deref(), Some("done"));
        let listed = list_tickets(&ws, Some("001"), None).unwrap();
        assert!(listed[0].done);
    }

    #[test]
    fn resolve_original_location() {
        let dir = TempDir::new().unwrap();
        let f = dir.path().join("tickets/001-foo.md");
        std::fs::create_dir_all(f.parent().unwrap()).unwrap();
        std::fs::write(&f, "hello").unwrap();
        assert_eq!(resolve_artifact_path(&f).unwrap(), f);
    }

    #[test]
    fn resolve_finds_done_sibling() {
        let dir = TempDir::new().unwrap();
        let done = dir.path().join("tickets/done/001-foo.md");
        std::fs::create_dir_all(done.parent().unwrap()).unwrap();
        std::fs::write(&done, "hello").unwrap();

        let original = dir.path().join("tickets/001-foo.md");
        assert_eq!(resolve_artifact_path(&original).unwrap(), done);
        assert_eq!(resolve_artifact_path(&done).unwrap(), done);
    }

    #[test]
    fn resolve_strips_done_when_moved_back() {
        let dir = TempDir::new().unwrap();
        let f = dir.path().join("tickets/001-foo.md");
        std::fs::create_dir_all(f.parent().unwrap()).unwrap();
        std::fs::write(&f, "hello").unwrap();

        let done_path = dir.path().join("tickets/done/001-foo.md");
        assert_eq!(resolve_artifact_path(&done_path).unwrap(), f);
    }

    #[test]
    fn resolve_missing_names_path() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("tickets/nonexistent.md");
        let err = resolve_artifact_path(&missing).unwrap_err();
        assert!(matches!(err, SprintError::ArtifactNotFound(_)));
        assert!(err.to_string().contains("nonexistent.md"));
    }
}
