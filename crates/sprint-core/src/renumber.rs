//! Insert a sprint mid-sequence by shifting later sprints up by one.
//!
//! The filesystem is changed first and the state store mirrors each rename
//! afterwards. Nothing spans both systems transactionally: a failure part
//! way through leaves the tree partially renumbered, and `reconcile` is the
//! way to inspect what is left.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{Result, SprintError};
use crate::frontmatter::Document;
use crate::io::rewrite_text;
use crate::lifecycle::check_can_renumber;
use crate::outcome::SideEffect;
use crate::paths;
use crate::sprint::{self, CreatedSprint, SprintInfo};
use crate::types::Phase;
use crate::workspace::Workspace;

// ---------------------------------------------------------------------------
// Reference rewriting
// ---------------------------------------------------------------------------

static SPRINT_REF_RE: OnceLock<Regex> = OnceLock::new();

fn sprint_ref_re() -> &'static Regex {
    SPRINT_REF_RE.get_or_init(|| Regex::new(r"\bSprint (\d{3,})\b").unwrap())
}

/// Replace `Sprint <old>` with `Sprint <new>`, leaving other ids alone.
pub fn rewrite_references(text: &str, old_id: &str, new_id: &str) -> String {
    sprint_ref_re()
        .replace_all(text, |caps: &Captures<'_>| {
            if &caps[1] == old_id {
                format!("Sprint {new_id}")
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Rewrite references in one file and set `fields` in its frontmatter.
///
/// Fields are only written into documents that already have frontmatter,
/// so plain markdown files never gain a metadata block.
fn rewrite_document(path: &Path, old_id: &str, new_id: &str, fields: &[(&str, &str)]) -> Result<bool> {
    rewrite_text(path, |content| {
        let updated = rewrite_references(content, old_id, new_id);
        if fields.is_empty() {
            return Ok(updated);
        }
        let mut doc = Document::parse(&updated)?;
        if doc.frontmatter.is_empty() {
            return Ok(updated);
        }
        for (key, value) in fields {
            doc.set(key, *value);
        }
        doc.render()
    })
}

fn rewrite_tickets(sprint_dir: &Path, old_id: &str, new_id: &str) -> Result<()> {
    let tdir = paths::tickets_dir(sprint_dir);
    for dir in [tdir.clone(), tdir.join(paths::DONE_DIR)] {
        if !dir.is_dir() {
            continue;
        }
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            let is_md = path.extension().is_some_and(|e| e == "md");
            if !path.is_file() || !is_md {
                continue;
            }
            let is_plan = path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().ends_with("-plan.md"));
            let sprint_id = [("sprint-id", new_id)];
            let fields: &[(&str, &str)] = if is_plan { &[] } else { &sprint_id };
            rewrite_document(&path, old_id, new_id, fields)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Shifting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renumbering {
    pub old_id: String,
    pub new_id: String,
    pub slug: String,
    /// Outcome of mirroring the rename into the state store.
    pub store: SideEffect,
}

/// Sprints to shift and their new ids, highest first.
///
/// Executing in this order means every target directory is already free.
pub fn shift_plan(active: &[SprintInfo], first_shifted: u32) -> Result<Vec<(SprintInfo, String)>> {
    let mut plan = Vec::new();
    for s in active {
        let n = paths::parse_id(&s.id)?;
        if n >= first_shifted {
            plan.push((n, s.clone()));
        }
    }
    plan.sort_by(|a, b| b.0.cmp(&a.0));
    plan.into_iter()
        .map(|(n, s)| Ok((s, paths::successor_id(n)?)))
        .collect()
}

fn shift_sprint(ws: &Workspace, sprint: &SprintInfo, new_id: &str) -> Result<Renumbering> {
    let old_id = sprint.id.as_str();
    let new_dir = ws
        .sprints_dir()
        .join(paths::sprint_dir_name(new_id, &sprint.slug));
    if new_dir.exists() {
        return Err(SprintError::DuplicateSprint(new_id.to_string()));
    }
    std::fs::rename(&sprint.path, &new_dir)?;

    let branch = paths::branch_name(new_id, &sprint.slug);
    rewrite_document(
        &new_dir.join(paths::SPRINT_DOC),
        old_id,
        new_id,
        &[("id", new_id), ("branch", branch.as_str())],
    )?;
    for doc in paths::PLANNING_DOCS.iter().filter(|d| **d != paths::SPRINT_DOC) {
        rewrite_document(&new_dir.join(doc), old_id, new_id, &[])?;
    }
    rewrite_tickets(&new_dir, old_id, new_id)?;
    tracing::info!(from = old_id, to = new_id, slug = %sprint.slug, "sprint renumbered");

    let store = match ws.store() {
        None => SideEffect::skipped("phase gating disabled"),
        Some(store) => match store.rename_sprint(old_id, new_id, Some(&branch)) {
            Err(SprintError::NotRegistered(_)) => SideEffect::skipped("sprint not registered"),
            other => SideEffect::from_result("mirror renumber", other),
        },
    };

    Ok(Renumbering {
        old_id: old_id.to_string(),
        new_id: new_id.to_string(),
        slug: sprint.slug.clone(),
        store,
    })
}

// ---------------------------------------------------------------------------
// insert_sprint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertedSprint {
    #[serde(flatten)]
    pub sprint: CreatedSprint,
    /// Shifted sprints in ascending order of their old id.
    pub renumbered: Vec<Renumbering>,
}

/// Create a sprint directly after `after_id`, shifting every later active
/// sprint up by one.
///
/// Every sprint to be shifted must still be in `planning-docs` (or have no
/// known phase); otherwise nothing is touched.
pub fn insert_sprint(ws: &Workspace, after_id: &str, title: &str) -> Result<InsertedSprint> {
    let active = sprint::active_sprints(ws)?;
    let anchor_id = paths::normalize_id(after_id)?;
    if !active.iter().any(|s| s.id == anchor_id) {
        return Err(SprintError::NotFound(anchor_id));
    }
    let anchor = paths::parse_id(&anchor_id)?;
    let new_id = paths::successor_id(anchor)?;

    let plan = shift_plan(&active, anchor + 1)?;
    for (s, _) in plan.iter().rev() {
        check_can_renumber(ws.store(), &s.id)?;
    }

    let mut renumbered = Vec::with_capacity(plan.len());
    for (s, to) in &plan {
        renumbered.push(shift_sprint(ws, s, to)?);
    }
    renumbered.reverse();

    let slug = paths::slugify(title);
    let dir = ws.sprints_dir().join(paths::sprint_dir_name(&new_id, &slug));
    sprint::materialize(&dir, &new_id, title, &slug)?;
    let branch = paths::branch_name(&new_id, &slug);
    let registration = sprint::register_best_effort(ws, &new_id, &slug, &branch);
    tracing::info!(sprint = %new_id, shifted = renumbered.len(), "sprint inserted");

    Ok(InsertedSprint {
        sprint: CreatedSprint {
            id: new_id,
            title: title.to_string(),
            slug,
            branch,
            path: dir,
            phase: Phase::initial(),
            registration,
        },
        renumbered,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::sprint::create_sprint;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn four_sprints(dir: &TempDir) -> Workspace {
        let ws = Workspace::open(dir.path()).unwrap();
        for title in ["Alpha", "Beta", "Gamma", "Delta"] {
            create_sprint(&ws, title).unwrap();
        }
        ws
    }

    fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        fn walk(dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
            for entry in std::fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    out.insert(path.clone(), Vec::new());
                    walk(&path, out);
                } else if !path.to_string_lossy().contains(".sprint-state.db") {
                    out.insert(path.clone(), std::fs::read(&path).unwrap());
                }
            }
        }
        let mut out = BTreeMap::new();
        walk(root, &mut out);
        out
    }

    fn active_dirs(ws: &Workspace) -> Vec<String> {
        sprint::active_sprints(ws)
            .unwrap()
            .iter()
            .map(|s| paths::sprint_dir_name(&s.id, &s.slug))
            .collect()
    }

    #[test]
    fn rewrites_only_matching_references() {
        let text = "# Sprint 002: Beta\nSee Sprint 003 and Sprint 0021.\n";
        assert_eq!(
            rewrite_references(text, "002", "003"),
            "# Sprint 003: Beta\nSee Sprint 003 and Sprint 0021.\n"
        );
    }

    #[test]
    fn shift_plan_is_descending() {
        let dir = TempDir::new().unwrap();
        let ws = four_sprints(&dir);
        let active = sprint::active_sprints(&ws).unwrap();
        let plan = shift_plan(&active, 2).unwrap();
        let order: Vec<_> = plan
            .iter()
            .map(|(s, to)| (s.id.as_str(), to.as_str()))
            .collect();
        assert_eq!(order, [("004", "005"), ("003", "004"), ("002", "003")]);
    }

    #[test]
    fn insert_in_the_middle_shifts_later_sprints() {
        let dir = TempDir::new().unwrap();
        let ws = four_sprints(&dir);

        let inserted = insert_sprint(&ws, "002", "Urgent Fix").unwrap();
        assert_eq!(inserted.sprint.id, "003");
        assert_eq!(inserted.sprint.phase, Phase::PlanningDocs);
        assert!(inserted.sprint.registration.is_applied());

        let pairs: Vec<_> = inserted
            .renumbered
            .iter()
            .map(|r| (r.old_id.as_str(), r.new_id.as_str()))
            .collect();
        assert_eq!(pairs, [("003", "004"), ("004", "005")]);
        assert!(inserted.renumbered.iter().all(|r| r.store.is_applied()));

        assert_eq!(
            active_dirs(&ws),
            [
                "001-alpha",
                "002-beta",
                "003-urgent-fix",
                "004-gamma",
                "005-delta"
            ]
        );

        let gamma = ws.sprints_dir().join("004-gamma");
        let doc = Document::read(&gamma.join("sprint.md")).unwrap();
        assert_eq!(doc.get_str("id").as_deref(), Some("004"));
        assert_eq!(doc.get_str("branch").as_deref(), Some("sprint/004-gamma"));
        assert!(doc.body.contains("# Sprint 004: Gamma"));
        let usecases = std::fs::read_to_string(gamma.join("usecases.md")).unwrap();
        assert!(usecases.contains("# Sprint 004 Use Cases"));

        let store = ws.store().unwrap();
        let ids: Vec<_> = store.list().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, ["001", "002", "003", "004", "005"]);
        assert_eq!(store.get_state("004").unwrap().sprint.slug, "gamma");
        assert_eq!(store.get_state("003").unwrap().sprint.slug, "urgent-fix");
        assert_eq!(
            store.get_state("005").unwrap().sprint.branch.as_deref(),
            Some("sprint/005-delta")
        );
    }

    #[test]
    fn ids_stay_contiguous() {
        let dir = TempDir::new().unwrap();
        let ws = four_sprints(&dir);
        insert_sprint(&ws, "001", "One").unwrap();
        insert_sprint(&ws, "003", "Two").unwrap();

        let ids: Vec<u32> = sprint::active_sprints(&ws)
            .unwrap()
            .iter()
            .map(|s| s.id.parse().unwrap())
            .collect();
        assert_eq!(ids, (1..=6).collect::<Vec<_>>());
    }

    #[test]
    fn insert_after_last_shifts_nothing() {
        let dir = TempDir::new().unwrap();
        let ws = four_sprints(&dir);
        let inserted = insert_sprint(&ws, "004", "Epilogue").unwrap();
        assert_eq!(inserted.sprint.id, "005");
        assert!(inserted.renumbered.is_empty());
    }

    #[test]
    fn unknown_anchor_is_not_found() {
        let dir = TempDir::new().unwrap();
        let ws = four_sprints(&dir);
        let err = insert_sprint(&ws, "009", "Nowhere").unwrap_err();
        assert!(matches!(err, SprintError::NotFound(ref id) if id == "009"));
    }

    #[test]
    fn unsafe_shift_leaves_tree_and_store_untouched() {
        let dir = TempDir::new().unwrap();
        let ws = four_sprints(&dir);
        let store = ws.store().unwrap();
        store.advance("004").unwrap();

        let before_tree = snapshot(dir.path());
        let before_store = store.list().unwrap();

        let err = insert_sprint(&ws, "001", "Too Late").unwrap_err();
        assert!(matches!(err, SprintError::UnsafeRenumber { ref sprint, .. } if sprint == "004"));

        assert_eq!(snapshot(dir.path()), before_tree);
        assert_eq!(store.list().unwrap(), before_store);
    }

    #[test]
    fn tickets_follow_their_sprint() {
        let dir = TempDir::new().unwrap();
        let ws = four_sprints(&dir);
        let tdir = ws.sprints_dir().join("003-gamma/tickets");
        std::fs::write(
            tdir.join("001-task.md"),
            "---\nid: '001'\ntitle: Task\nstatus: todo\nsprint-id: '003'\n---\n\nPart of Sprint 003.\n",
        )
        .unwrap();
        std::fs::write(tdir.join("001-task-plan.md"), "# Plan for Sprint 003\n").unwrap();
        std::fs::write(
            tdir.join("done/002-old.md"),
            "---\nid: '002'\nsprint-id: '003'\n---\nDone in Sprint 003.\n",
        )
        .unwrap();

        insert_sprint(&ws, "002", "Wedge").unwrap();

        let moved = ws.sprints_dir().join("004-gamma/tickets");
        let ticket = Document::read(&moved.join("001-task.md")).unwrap();
        assert_eq!(ticket.get_str("sprint-id").as_deref(), Some("004"));
        assert!(ticket.body.contains("Part of Sprint 004."));
        assert_eq!(
            std::fs::read_to_string(moved.join("001-task-plan.md")).unwrap(),
            "# Plan for Sprint 004\n"
        );
        let done = Document::read(&moved.join("done/002-old.md")).unwrap();
        assert_eq!(done.get_str("sprint-id").as_deref(), Some("004"));
    }

    #[test]
    fn ungated_insert_skips_store() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.gating.enforce = false;
        let ws = Workspace::with_config(dir.path(), cfg);
        create_sprint(&ws, "Alpha").unwrap();
        create_sprint(&ws, "Beta").unwrap();

        let inserted = insert_sprint(&ws, "001", "Wedge").unwrap();
        assert!(matches!(inserted.renumbered[0].store, SideEffect::Skipped { .. }));
        assert!(matches!(inserted.sprint.registration, SideEffect::Skipped { .. }));
        assert!(!paths::state_db_path(dir.path()).exists());
    }

    #[test]
    fn unregistered_sprints_shift_without_store_rows() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        let mut cfg = Config::default();
        cfg.gating.enforce = false;
        let quiet = Workspace::with_config(dir.path(), cfg);
        create_sprint(&quiet, "Alpha").unwrap();
        create_sprint(&quiet, "Beta").unwrap();

        let inserted = insert_sprint(&ws, "001", "Wedge").unwrap();
        assert!(matches!(inserted.renumbered[0].store, SideEffect::Skipped { .. }));
        assert!(inserted.sprint.registration.is_applied());
        assert_eq!(active_dirs(&ws), ["001-alpha", "002-wedge", "003-beta"]);
    }

    #[test]
    fn store_mirror_failure_does_not_stop_the_shift() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        for title in ["Alpha", "Beta", "Gamma"] {
            create_sprint(&ws, title).unwrap();
        }
        ws.store().unwrap().register("004", "stale", None).unwrap();

        let inserted = insert_sprint(&ws, "001", "Wedge").unwrap();
        let outcomes: Vec<_> = inserted
            .renumbered
            .iter()
            .map(|r| (r.old_id.as_str(), r.new_id.as_str(), r.store.is_failed()))
            .collect();
        assert_eq!(outcomes, [("002", "003", true), ("003", "004", true)]);
        match &inserted.renumbered[1].store {
            SideEffect::Failed { error } => assert!(error.contains("'004' is already registered")),
            other => panic!("expected a failed mirror, got {other}"),
        }
        assert!(inserted.sprint.registration.is_failed());

        assert_eq!(
            active_dirs(&ws),
            ["001-alpha", "002-wedge", "003-beta", "004-gamma"]
        );
        let gamma = Document::read(&ws.sprints_dir().join("004-gamma/sprint.md")).unwrap();
        assert_eq!(gamma.get_str("id").as_deref(), Some("004"));
        assert_eq!(ws.store().unwrap().get_state("004").unwrap().sprint.slug, "stale");
    }
}
