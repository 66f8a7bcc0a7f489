//! Sprint directories under `docs/plans/sprints/`.
//!
//! The filesystem is authoritative for which sprints exist: the directory
//! name carries the id and slug, `sprint.md` carries title and status. The
//! state store is updated after the filesystem, best effort.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, SprintError};
use crate::frontmatter::Document;
use crate::io::{atomic_write, ensure_dir};
use crate::outcome::SideEffect;
use crate::paths;
use crate::release::{self, GitTagger, ReleaseTagger};
use crate::ticket;
use crate::types::{Phase, TicketStatus};
use crate::workspace::Workspace;

pub const STATUS_PLANNING: &str = "planning";
pub const STATUS_DONE: &str = "done";

// ---------------------------------------------------------------------------
// SprintInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintInfo {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub status: Option<String>,
    pub branch: Option<String>,
    pub path: PathBuf,
    pub closed: bool,
}

impl SprintInfo {
    fn load(dir: &Path, id: String, slug: String, closed: bool) -> Result<Self> {
        let doc_path = dir.join(paths::SPRINT_DOC);
        let doc = if doc_path.is_file() {
            Document::read(&doc_path)?
        } else {
            Document::default()
        };
        Ok(Self {
            title: doc.get_str("title").unwrap_or_else(|| slug.clone()),
            status: doc.get_str("status"),
            branch: doc.get_str("branch"),
            id,
            slug,
            path: dir.to_path_buf(),
            closed,
        })
    }

    pub fn sprint_doc(&self) -> PathBuf {
        self.path.join(paths::SPRINT_DOC)
    }

    pub fn tickets_dir(&self) -> PathBuf {
        paths::tickets_dir(&self.path)
    }
}

/// Every `SprintInfo` produced by `scan` has an id that parses.
fn sort_by_id(sprints: &mut [SprintInfo]) {
    sprints.sort_by_cached_key(|s| paths::parse_id(&s.id).ok());
}

/// Sprint directories directly under `dir`, sorted by numeric id.
fn scan(dir: &Path, closed: bool) -> Result<Vec<SprintInfo>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut sprints = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some((id, slug)) = paths::split_ordinal_name(&name.to_string_lossy()) else {
            continue;
        };
        if paths::parse_id(&id).is_err() {
            tracing::warn!(dir = %entry.path().display(), "skipping sprint directory with out-of-range id");
            continue;
        }
        sprints.push(SprintInfo::load(&entry.path(), id, slug, closed)?);
    }
    sort_by_id(&mut sprints);
    Ok(sprints)
}

pub fn active_sprints(ws: &Workspace) -> Result<Vec<SprintInfo>> {
    scan(&ws.sprints_dir(), false)
}

pub fn closed_sprints(ws: &Workspace) -> Result<Vec<SprintInfo>> {
    scan(&ws.closed_sprints_dir(), true)
}

/// Active then closed sprints, optionally filtered by `status`.
pub fn list_sprints(ws: &Workspace, status: Option<&str>) -> Result<Vec<SprintInfo>> {
    let mut all = active_sprints(ws)?;
    all.extend(closed_sprints(ws)?);
    sort_by_id(&mut all);
    if let Some(status) = status {
        all.retain(|s| s.status.as_deref() == Some(status));
    }
    Ok(all)
}

/// Locate a sprint, preferring the active tree over `sprints/done/`.
pub fn find_sprint(ws: &Workspace, id: &str) -> Result<SprintInfo> {
    let id = paths::normalize_id(id)?;
    if let Some(active) = active_sprints(ws)?.into_iter().find(|s| s.id == id) {
        return Ok(active);
    }
    closed_sprints(ws)?
        .into_iter()
        .find(|s| s.id == id)
        .ok_or(SprintError::NotFound(id))
}

pub fn find_active_sprint(ws: &Workspace, id: &str) -> Result<SprintInfo> {
    let id = paths::normalize_id(id)?;
    active_sprints(ws)?
        .into_iter()
        .find(|s| s.id == id)
        .ok_or(SprintError::NotFound(id))
}

/// Highest id across active and closed sprints, plus one.
pub fn next_sprint_id(ws: &Workspace) -> Result<String> {
    let max = list_sprints(ws, None)?
        .iter()
        .filter_map(|s| paths::parse_id(&s.id).ok())
        .max()
        .unwrap_or(0);
    paths::successor_id(max)
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

fn draft_frontmatter() -> Mapping {
    let mut fm = Mapping::new();
    fm.insert(Value::from("status"), Value::from("draft"));
    fm
}

fn sprint_document(id: &str, title: &str, slug: &str) -> Document {
    let mut doc = Document::default();
    doc.set("id", id);
    doc.set("title", title);
    doc.set("status", STATUS_PLANNING);
    doc.set("branch", paths::branch_name(id, slug));
    doc.set_list("use-cases", &[]);
    doc.body = format!(
        "\n# Sprint {id}: {title}\n\
         \n## Goals\n\n(Describe what this sprint aims to accomplish.)\n\
         \n## Problem\n\n(What problem does this sprint address?)\n\
         \n## Solution\n\n(High-level description of the approach.)\n\
         \n## Success Criteria\n\n(How will we know the sprint succeeded?)\n\
         \n## Scope\n\n### In Scope\n\n(List what is included in this sprint.)\n\
         \n### Out of Scope\n\n(List what is explicitly excluded.)\n\
         \n## Test Strategy\n\n(Describe the overall testing approach for this sprint.)\n\
         \n## Architecture Notes\n\n(Key design decisions and constraints.)\n\
         \n## Definition of Ready\n\n\
         Before tickets can be created, all of the following must be true:\n\n\
         - [ ] Sprint planning documents are complete (sprint.md, use cases, technical plan)\n\
         - [ ] Architecture review passed\n\
         - [ ] Stakeholder has approved the sprint plan\n\
         \n## Tickets\n\n(To be created after sprint approval.)\n"
    );
    doc
}

fn usecases_document(id: &str) -> Document {
    Document::new(
        draft_frontmatter(),
        format!(
            "\n# Sprint {id} Use Cases\n\
             \n## SUC-001: (Title)\nParent: UC-XXX\n\n\
             - **Actor**: (Who)\n\
             - **Preconditions**: (What must be true before)\n\
             - **Main Flow**:\n  1. (Step)\n\
             - **Postconditions**: (What is true after)\n\
             - **Acceptance Criteria**:\n  - [ ] (Criterion)\n"
        ),
    )
}

fn technical_plan_document(id: &str) -> Document {
    Document::new(
        draft_frontmatter(),
        format!(
            "\n# Sprint {id} Technical Plan\n\
             \n## Architecture Overview\n\n(How the components fit together.)\n\
             \n## Component Design\n\n### Component: (Name)\n\n**Use Cases**: (SUC-NNN)\n\n\
             (Description, key functions, interfaces.)\n\
             \n## Open Questions\n\n(Unresolved design decisions.)\n"
        ),
    )
}

/// Write a fresh sprint directory with its planning documents.
pub(crate) fn materialize(dir: &Path, id: &str, title: &str, slug: &str) -> Result<()> {
    ensure_dir(&paths::tickets_dir(dir).join(paths::DONE_DIR))?;
    sprint_document(id, title, slug).write(&dir.join(paths::SPRINT_DOC))?;
    usecases_document(id).write(&dir.join(paths::USECASES_DOC))?;
    technical_plan_document(id).write(&dir.join(paths::TECHNICAL_PLAN_DOC))?;
    Ok(())
}

/// Register a new sprint in the store if gating is on.
pub(crate) fn register_best_effort(ws: &Workspace, id: &str, slug: &str, branch: &str) -> SideEffect {
    match ws.store() {
        None => SideEffect::skipped("phase gating disabled"),
        Some(store) => SideEffect::from_result("register sprint", store.register(id, slug, Some(branch))),
    }
}

// ---------------------------------------------------------------------------
// create_sprint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedSprint {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub branch: String,
    pub path: PathBuf,
    pub phase: Phase,
    pub registration: SideEffect,
}

pub fn create_sprint(ws: &Workspace, title: &str) -> Result<CreatedSprint> {
    let id = next_sprint_id(ws)?;
    let slug = paths::slugify(title);
    let dir = ws.sprints_dir().join(paths::sprint_dir_name(&id, &slug));
    if dir.exists() {
        return Err(SprintError::DuplicateSprint(id));
    }

    materialize(&dir, &id, title, &slug)?;
    let branch = paths::branch_name(&id, &slug);
    let registration = register_best_effort(ws, &id, &slug, &branch);
    tracing::info!(sprint = %id, path = %dir.display(), "sprint created");

    Ok(CreatedSprint {
        id,
        title: title.to_string(),
        slug,
        branch,
        path: dir,
        phase: Phase::initial(),
        registration,
    })
}

// ---------------------------------------------------------------------------
// sprint_status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketCounts {
    pub todo: usize,
    #[serde(rename = "in-progress")]
    pub in_progress: usize,
    pub done: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintStatus {
    pub id: String,
    pub title: String,
    pub status: Option<String>,
    /// Lifecycle phase from the store; `None` when gating is off or the
    /// sprint was never registered.
    pub phase: Option<Phase>,
    pub closed: bool,
    pub path: PathBuf,
    pub tickets: TicketCounts,
}

pub fn sprint_status(ws: &Workspace, id: &str) -> Result<SprintStatus> {
    let sprint = find_sprint(ws, id)?;
    let phase = match ws.store() {
        Some(store) => store.phase_of(&sprint.id)?,
        None => None,
    };

    let mut tickets = TicketCounts::default();
    for t in ticket::sprint_tickets(&sprint.path, &sprint.id)? {
        match TicketStatus::from_str(&t.status) {
            Ok(TicketStatus::Todo) => tickets.todo += 1,
            Ok(TicketStatus::InProgress) => tickets.in_progress += 1,
            Ok(TicketStatus::Done) => tickets.done += 1,
            Err(_) => tracing::debug!(ticket = %t.path.display(), status = %t.status, "unknown ticket status"),
        }
    }

    Ok(SprintStatus {
        id: sprint.id,
        title: sprint.title,
        status: sprint.status,
        phase,
        closed: sprint.closed,
        path: sprint.path,
        tickets,
    })
}

// ---------------------------------------------------------------------------
// close_sprint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedSprint {
    pub id: String,
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    pub phase: SideEffect,
    pub lock: SideEffect,
    pub release: SideEffect,
    pub version_file: SideEffect,
    pub version: Option<String>,
}

pub fn close_sprint(ws: &Workspace, id: &str) -> Result<ClosedSprint> {
    let tagger = GitTagger::new(ws.root());
    close_sprint_with(ws, id, &tagger)
}

fn file_error(path: &Path) -> impl FnOnce(std::io::Error) -> SprintError + '_ {
    move |source| SprintError::File {
        path: path.to_path_buf(),
        source,
    }
}

/// Close a sprint, tagging releases through `tagger`.
///
/// The filesystem changes first: `sprint.md` is marked done and the
/// directory moves under `sprints/done/`. Only those steps can fail the
/// call, and a failed move puts `sprint.md` back. Phase advancement, lock
/// release and tagging follow as side effects.
pub fn close_sprint_with(ws: &Workspace, id: &str, tagger: &dyn ReleaseTagger) -> Result<ClosedSprint> {
    let sprint = find_sprint(ws, id)?;
    if sprint.closed {
        return Err(SprintError::AlreadyDone(sprint.id));
    }

    let doc_path = sprint.sprint_doc();
    let original = std::fs::read_to_string(&doc_path).map_err(file_error(&doc_path))?;
    let mut doc = Document::parse(&original)?;
    doc.set("status", STATUS_DONE);
    let rendered = doc.render()?;

    let closed_dir = ws.closed_sprints_dir();
    let new_path = closed_dir.join(paths::sprint_dir_name(&sprint.id, &sprint.slug));
    if new_path.exists() {
        let taken = std::io::Error::new(std::io::ErrorKind::AlreadyExists, "closed sprint directory exists");
        return Err(file_error(&new_path)(taken));
    }
    ensure_dir(&closed_dir)?;

    atomic_write(&doc_path, rendered.as_bytes())?;
    if let Err(e) = std::fs::rename(&sprint.path, &new_path) {
        if let Err(restore) = atomic_write(&doc_path, original.as_bytes()) {
            tracing::warn!(path = %doc_path.display(), error = %restore, "could not restore sprint.md");
        }
        return Err(file_error(&sprint.path)(e));
    }

    let phase = match ws.store() {
        None => SideEffect::skipped("phase gating disabled"),
        Some(store) => match store.advance_to(&sprint.id, Phase::Done) {
            Err(SprintError::NotRegistered(_)) => SideEffect::skipped("sprint not registered"),
            other => SideEffect::from_result("advance to done", other),
        },
    };

    let lock = match ws.store() {
        None => SideEffect::skipped("phase gating disabled"),
        Some(store) => match store.lock_holder() {
            Ok(Some(holder)) if holder.sprint_id == sprint.id => {
                SideEffect::from_result("release lock", store.release_lock(&sprint.id))
            }
            Ok(_) => SideEffect::skipped("lock not held by this sprint"),
            Err(e) => SideEffect::from_result::<(), _>("read lock holder", Err(e)),
        },
    };

    let cfg = &ws.config().release;
    let (release, version_file, version) = if cfg.tag_on_close {
        let today = Utc::now().date_naive();
        let version_root = cfg.bump_version_file.then(|| ws.root());
        match release::tag_release(tagger, cfg.major, today, version_root) {
            Ok(tagged) => (SideEffect::Applied, tagged.version_file, Some(tagged.version)),
            Err(e) => (
                SideEffect::from_result::<(), _>("tag release", Err(e)),
                SideEffect::skipped("release was not tagged"),
                None,
            ),
        }
    } else {
        let off = SideEffect::skipped("release.tag_on_close is off");
        (off.clone(), off, None)
    };

    tracing::info!(sprint = %sprint.id, path = %new_path.display(), "sprint closed");
    Ok(ClosedSprint {
        id: sprint.id,
        old_path: sprint.path,
        new_path,
        phase,
        lock,
        release,
        version_file,
        version,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn workspace(dir: &TempDir) -> Workspace {
        Workspace::open(dir.path()).unwrap()
    }

    fn ungated(dir: &TempDir) -> Workspace {
        let mut cfg = Config::default();
        cfg.gating.enforce = false;
        Workspace::with_config(dir.path(), cfg)
    }

    #[derive(Default)]
    struct FakeTagger {
        tags: Vec<String>,
        created: RefCell<Vec<String>>,
    }

    impl ReleaseTagger for FakeTagger {
        fn existing_tags(&self) -> Result<Vec<String>> {
            Ok(self.tags.clone())
        }

        fn create_tag(&self, tag: &str) -> Result<()> {
            self.created.borrow_mut().push(tag.to_string());
            Ok(())
        }
    }

    #[test]
    fn create_lays_out_directory() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        let created = create_sprint(&ws, "Test Sprint").unwrap();

        assert_eq!(created.id, "001");
        assert_eq!(created.branch, "sprint/001-test-sprint");
        assert!(created.registration.is_applied());
        let sdir = dir.path().join("docs/plans/sprints/001-test-sprint");
        assert_eq!(created.path, sdir);
        assert!(sdir.join("sprint.md").is_file());
        assert!(sdir.join("usecases.md").is_file());
        assert!(sdir.join("technical-plan.md").is_file());
        assert!(!sdir.join("brief.md").exists());
        assert!(sdir.join("tickets/done").is_dir());

        let doc = Document::read(&sdir.join("sprint.md")).unwrap();
        assert_eq!(doc.get_str("id").as_deref(), Some("001"));
        assert_eq!(doc.get_str("status").as_deref(), Some("planning"));
        assert!(doc.body.contains("# Sprint 001: Test Sprint"));

        let state = ws.store().unwrap().get_state("001").unwrap();
        assert_eq!(state.sprint.phase, Phase::PlanningDocs);
        assert_eq!(state.sprint.branch.as_deref(), Some("sprint/001-test-sprint"));
    }

    #[test]
    fn ids_increment_even_for_same_title() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        assert_eq!(create_sprint(&ws, "Sprint").unwrap().id, "001");
        assert_eq!(create_sprint(&ws, "Sprint").unwrap().id, "002");
    }

    #[test]
    fn ids_continue_after_closed_sprints() {
        let dir = TempDir::new().unwrap();
        let ws = ungated(&dir);
        create_sprint(&ws, "One").unwrap();
        close_sprint_with(&ws, "001", &FakeTagger::default()).unwrap();
        assert_eq!(create_sprint(&ws, "Two").unwrap().id, "002");
    }

    #[test]
    fn ungated_create_skips_registration() {
        let dir = TempDir::new().unwrap();
        let ws = ungated(&dir);
        let created = create_sprint(&ws, "Quiet").unwrap();
        assert!(matches!(created.registration, SideEffect::Skipped { .. }));
        assert!(!paths::state_db_path(dir.path()).exists());
    }

    #[test]
    fn list_and_filter_by_status() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        assert!(list_sprints(&ws, None).unwrap().is_empty());

        create_sprint(&ws, "First").unwrap();
        create_sprint(&ws, "Second").unwrap();
        let all = list_sprints(&ws, None).unwrap();
        let ids: Vec<_> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["001", "002"]);

        assert_eq!(list_sprints(&ws, Some("planning")).unwrap().len(), 2);
        assert!(list_sprints(&ws, Some("done")).unwrap().is_empty());
    }

    #[test]
    fn find_prefers_active_then_done() {
        let dir = TempDir::new().unwrap();
        let ws = ungated(&dir);
        create_sprint(&ws, "Alpha").unwrap();
        assert!(!find_sprint(&ws, "1").unwrap().closed);

        close_sprint_with(&ws, "001", &FakeTagger::default()).unwrap();
        let found = find_sprint(&ws, "001").unwrap();
        assert!(found.closed);
        assert!(matches!(
            find_active_sprint(&ws, "001"),
            Err(SprintError::NotFound(_))
        ));
        assert!(matches!(find_sprint(&ws, "999"), Err(SprintError::NotFound(_))));
    }

    #[test]
    fn status_reports_phase_and_ticket_counts() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        create_sprint(&ws, "Work").unwrap();
        let store = ws.store().unwrap();
        store.advance("001").unwrap();
        store.record_gate("001", "architecture_review", "passed", None).unwrap();
        store.advance("001").unwrap();
        store.record_gate("001", "stakeholder_approval", "passed", None).unwrap();
        store.advance("001").unwrap();
        ticket::create_ticket(&ws, "001", "Task A").unwrap();
        ticket::create_ticket(&ws, "001", "Task B").unwrap();

        let status = sprint_status(&ws, "001").unwrap();
        assert_eq!(status.status.as_deref(), Some("planning"));
        assert_eq!(status.phase, Some(Phase::Ticketing));
        assert_eq!(status.tickets.todo, 2);
        assert_eq!(status.tickets.done, 0);
    }

    #[test]
    fn close_moves_directory_and_marks_done() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        create_sprint(&ws, "Sprint").unwrap();

        let closed = close_sprint_with(&ws, "001", &FakeTagger::default()).unwrap();
        assert!(!closed.old_path.exists());
        assert!(closed.new_path.ends_with("sprints/done/001-sprint"));
        let doc = Document::read(&closed.new_path.join("sprint.md")).unwrap();
        assert_eq!(doc.get_str("status").as_deref(), Some("done"));

        // Gates were never recorded, so the phase walk fails but the close succeeds.
        assert!(closed.phase.is_failed());
        assert!(matches!(closed.lock, SideEffect::Skipped { .. }));
        assert!(matches!(closed.release, SideEffect::Skipped { .. }));
    }

    #[test]
    fn close_completes_lifecycle_and_releases_lock() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        create_sprint(&ws, "Sprint").unwrap();
        let store = ws.store().unwrap();
        store.record_gate("001", "architecture_review", "passed", None).unwrap();
        store.record_gate("001", "stakeholder_approval", "passed", None).unwrap();
        store.acquire_lock("001").unwrap();

        let closed = close_sprint_with(&ws, "001", &FakeTagger::default()).unwrap();
        assert!(closed.phase.is_applied());
        assert!(closed.lock.is_applied());
        assert_eq!(store.phase_of("001").unwrap(), Some(Phase::Done));
        assert!(store.lock_holder().unwrap().is_none());
    }

    #[test]
    fn close_twice_is_already_done() {
        let dir = TempDir::new().unwrap();
        let ws = ungated(&dir);
        create_sprint(&ws, "Sprint").unwrap();
        close_sprint_with(&ws, "001", &FakeTagger::default()).unwrap();
        assert!(matches!(
            close_sprint_with(&ws, "001", &FakeTagger::default()),
            Err(SprintError::AlreadyDone(_))
        ));
    }

    #[test]
    fn close_tags_release_when_configured() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.gating.enforce = false;
        cfg.release.tag_on_close = true;
        cfg.release.major = 1;
        let ws = Workspace::with_config(dir.path(), cfg);
        create_sprint(&ws, "Sprint").unwrap();

        let tagger = FakeTagger::default();
        let closed = close_sprint_with(&ws, "001", &tagger).unwrap();
        assert!(closed.release.is_applied());
        let version = closed.version.unwrap();
        assert!(version.starts_with("1."));
        assert!(version.ends_with(".1"));
        assert_eq!(tagger.created.borrow().as_slice(), [format!("v{version}")]);
    }

    #[test]
    fn close_without_sprint_doc_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        let created = create_sprint(&ws, "Sprint").unwrap();
        let store = ws.store().unwrap();
        store.record_gate("001", "architecture_review", "passed", None).unwrap();
        store.record_gate("001", "stakeholder_approval", "passed", None).unwrap();
        store.acquire_lock("001").unwrap();
        std::fs::remove_file(created.path.join("sprint.md")).unwrap();

        let err = close_sprint_with(&ws, "001", &FakeTagger::default()).unwrap_err();
        assert!(matches!(err, SprintError::File { .. }));
        assert!(err.to_string().contains("sprint.md"));

        assert_eq!(store.phase_of("001").unwrap(), Some(Phase::PlanningDocs));
        assert_eq!(store.lock_holder().unwrap().unwrap().sprint_id, "001");
        assert!(created.path.is_dir());
        assert!(!ws.closed_sprints_dir().join("001-sprint").exists());
    }

    #[test]
    fn close_into_occupied_target_fails_before_any_change() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        let created = create_sprint(&ws, "Sprint").unwrap();
        std::fs::create_dir_all(ws.closed_sprints_dir().join("001-sprint")).unwrap();
        let before = std::fs::read_to_string(created.path.join("sprint.md")).unwrap();

        let err = close_sprint_with(&ws, "001", &FakeTagger::default()).unwrap_err();
        assert!(err.to_string().contains("001-sprint"));
        assert_eq!(
            std::fs::read_to_string(created.path.join("sprint.md")).unwrap(),
            before
        );
        assert_eq!(ws.store().unwrap().phase_of("001").unwrap(), Some(Phase::PlanningDocs));
    }

    #[test]
    fn close_stamps_version_file_when_configured() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.gating.enforce = false;
        cfg.release.tag_on_close = true;
        cfg.release.bump_version_file = true;
        let ws = Workspace::with_config(dir.path(), cfg);
        std::fs::write(dir.path().join("pyproject.toml"), "[project]\nversion = \"0.1.0\"\n").unwrap();
        create_sprint(&ws, "Sprint").unwrap();

        let closed = close_sprint_with(&ws, "001", &FakeTagger::default()).unwrap();
        assert!(closed.version_file.is_applied());
        let version = closed.version.unwrap();
        let pyproject = std::fs::read_to_string(dir.path().join("pyproject.toml")).unwrap();
        assert!(pyproject.contains(&format!("version = \"{version}\"")));
    }

    #[test]
    fn non_mapping_sprint_doc_does_not_break_the_workspace() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        create_sprint(&ws, "Alpha").unwrap();
        let beta = create_sprint(&ws, "Beta").unwrap();
        std::fs::write(beta.path.join("sprint.md"), "---\n- just\n- a list\n---\n").unwrap();

        let all = list_sprints(&ws, None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].title, "beta");
        assert!(all[1].status.is_none());
        assert_eq!(create_sprint(&ws, "Gamma").unwrap().id, "003");
    }

    #[test]
    fn out_of_range_ids_are_skipped_or_rejected() {
        let dir = TempDir::new().unwrap();
        let ws = ungated(&dir);
        create_sprint(&ws, "Alpha").unwrap();
        std::fs::create_dir_all(ws.sprints_dir().join("99999999999-huge")).unwrap();

        let ids: Vec<String> = list_sprints(&ws, None).unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, ["001"]);
        assert_eq!(next_sprint_id(&ws).unwrap(), "002");

        std::fs::create_dir_all(ws.sprints_dir().join("4294967295-last")).unwrap();
        assert!(matches!(
            create_sprint(&ws, "Overflow"),
            Err(SprintError::InvalidSprintId(_))
        ));
    }
}
