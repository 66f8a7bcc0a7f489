use crate::error::{Result, SprintError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const PLANS_DIR: &str = "docs/plans";
pub const SPRINTS_DIR: &str = "docs/plans/sprints";
pub const DONE_DIR: &str = "done";
pub const TICKETS_DIR: &str = "tickets";

pub const CONFIG_FILE: &str = "docs/plans/config.yaml";
pub const STATE_DB_FILE: &str = "docs/plans/.sprint-state.db";

pub const SPRINT_DOC: &str = "sprint.md";
pub const USECASES_DOC: &str = "usecases.md";
pub const TECHNICAL_PLAN_DOC: &str = "technical-plan.md";
pub const BRIEF_DOC: &str = "brief.md";

/// Planning documents that carry `Sprint NNN` references alongside `sprint.md`.
pub const PLANNING_DOCS: &[&str] = &[SPRINT_DOC, USECASES_DOC, TECHNICAL_PLAN_DOC, BRIEF_DOC];

/// Width of the zero-padded sprint and ticket ordinals.
pub const ID_WIDTH: usize = 3;

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn sprints_dir(root: &Path) -> PathBuf {
    root.join(SPRINTS_DIR)
}

pub fn closed_sprints_dir(root: &Path) -> PathBuf {
    sprints_dir(root).join(DONE_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn state_db_path(root: &Path) -> PathBuf {
    root.join(STATE_DB_FILE)
}

pub fn sprint_dir_name(id: &str, slug: &str) -> String {
    format!("{id}-{slug}")
}

pub fn tickets_dir(sprint_dir: &Path) -> PathBuf {
    sprint_dir.join(TICKETS_DIR)
}

pub fn branch_name(id: &str, slug: &str) -> String {
    format!("sprint/{id}-{slug}")
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

pub fn format_id(n: u32) -> String {
    format!("{n:0width$}", width = ID_WIDTH)
}

pub fn parse_id(id: &str) -> Result<u32> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SprintError::InvalidSprintId(id.to_string()));
    }
    id.parse::<u32>()
        .map_err(|_| SprintError::InvalidSprintId(id.to_string()))
}

/// The id that follows `n`, failing instead of wrapping at `u32::MAX`.
pub fn successor_id(n: u32) -> Result<String> {
    n.checked_add(1)
        .map(format_id)
        .ok_or_else(|| SprintError::InvalidSprintId(format_id(n)))
}

/// Canonical zero-padded form of a user-supplied id (`"7"` → `"007"`).
pub fn normalize_id(id: &str) -> Result<String> {
    Ok(format_id(parse_id(id)?))
}

static DIR_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn dir_name_re() -> &'static Regex {
    DIR_NAME_RE.get_or_init(|| Regex::new(r"^(\d{3,})-(.+)$").unwrap())
}

/// Split a `<ordinal>-<slug>` directory or file stem into its parts.
pub fn split_ordinal_name(name: &str) -> Option<(String, String)> {
    let caps = dir_name_re().captures(name)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

static NON_SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn non_slug_re() -> &'static Regex {
    NON_SLUG_RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap())
}

/// Lowercase a title and collapse every run of non-alphanumerics into `-`.
pub fn slugify(title: &str) -> String {
    let lower = title.to_lowercase();
    non_slug_re()
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
