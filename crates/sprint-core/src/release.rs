//! Release versions of the form `<major>.<YYYYMMDD>.<build>`.
//!
//! The build number restarts at 1 each day and counts up across tags that
//! share the same major and date. Tags are written as `v<version>`.

use chrono::NaiveDate;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use crate::error::{Result, SprintError};
use crate::io::rewrite_text;
use crate::outcome::SideEffect;

static VERSION_RE: OnceLock<Regex> = OnceLock::new();

fn version_re() -> &'static Regex {
    VERSION_RE.get_or_init(|| Regex::new(r"^v?(\d+)\.(\d{8})\.(\d+)$").unwrap())
}

/// Next version for `major` on `today`, given the tags that already exist.
pub fn next_version(major: u32, today: NaiveDate, tags: &[String]) -> String {
    let date = today.format("%Y%m%d").to_string();
    let max_build = tags
        .iter()
        .filter_map(|tag| version_re().captures(tag.trim()))
        .filter(|caps| caps[1].parse::<u32>().ok() == Some(major) && caps[2] == *date)
        .filter_map(|caps| caps[3].parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{major}.{date}.{}", max_build.saturating_add(1))
}

// ---------------------------------------------------------------------------
// Version files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionFileKind {
    Pyproject,
    PackageJson,
}

/// Checked in order; the first one present wins.
const VERSION_FILES: [(&str, VersionFileKind); 2] = [
    ("pyproject.toml", VersionFileKind::Pyproject),
    ("package.json", VersionFileKind::PackageJson),
];

/// The project file that carries the release version, if any.
pub fn detect_version_file(root: &Path) -> Option<(PathBuf, VersionFileKind)> {
    VERSION_FILES
        .iter()
        .map(|(name, kind)| (root.join(name), *kind))
        .find(|(path, _)| path.is_file())
}

static PYPROJECT_VERSION_RE: OnceLock<Regex> = OnceLock::new();

fn pyproject_version_re() -> &'static Regex {
    PYPROJECT_VERSION_RE.get_or_init(|| Regex::new(r#"(?m)^version\s*=\s*"[^"]*""#).unwrap())
}

static JSON_VERSION_RE: OnceLock<Regex> = OnceLock::new();

fn json_version_re() -> &'static Regex {
    JSON_VERSION_RE.get_or_init(|| Regex::new(r#""version"\s*:\s*"([^"]*)""#).unwrap())
}

fn missing_version(path: &Path) -> SprintError {
    SprintError::MissingVersionField(path.display().to_string())
}

/// Replace the first top-level `version = "..."` line.
pub fn update_pyproject_version(path: &Path, version: &str) -> Result<()> {
    rewrite_text(path, |content| {
        if !pyproject_version_re().is_match(content) {
            return Err(missing_version(path));
        }
        let line = format!("version = \"{version}\"");
        Ok(pyproject_version_re()
            .replacen(content, 1, NoExpand(&line))
            .into_owned())
    })
    .map(|_| ())
}

/// Set the top-level `"version"` of a `package.json`.
///
/// The value is replaced in place so key order and formatting survive.
pub fn update_package_json_version(path: &Path, version: &str) -> Result<()> {
    rewrite_text(path, |content| {
        let data: serde_json::Value = serde_json::from_str(content)?;
        let current = data
            .get("version")
            .and_then(|v| v.as_str())
            .ok_or_else(|| missing_version(path))?;
        let field = json_version_re()
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .find(|m| m.as_str() == current)
            .ok_or_else(|| missing_version(path))?;
        let mut updated = content.to_string();
        updated.replace_range(field.range(), version);
        Ok(updated)
    })
    .map(|_| ())
}

pub fn update_version_file(path: &Path, kind: VersionFileKind, version: &str) -> Result<()> {
    match kind {
        VersionFileKind::Pyproject => update_pyproject_version(path, version),
        VersionFileKind::PackageJson => update_package_json_version(path, version),
    }
}

// ---------------------------------------------------------------------------
// Tag sinks
// ---------------------------------------------------------------------------

pub trait ReleaseTagger {
    fn existing_tags(&self) -> Result<Vec<String>>;
    fn create_tag(&self, tag: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedRelease {
    pub version: String,
    /// Outcome of stamping the version into `pyproject.toml` or `package.json`.
    pub version_file: SideEffect,
}

/// Compute the next version and create its `v<version>` tag.
///
/// With `version_root` set, the version is then written into the project's
/// version file under that directory. Only tagging can fail the call.
pub fn tag_release(
    tagger: &dyn ReleaseTagger,
    major: u32,
    today: NaiveDate,
    version_root: Option<&Path>,
) -> Result<TaggedRelease> {
    let tags = tagger.existing_tags()?;
    let version = next_version(major, today, &tags);
    tagger.create_tag(&format!("v{version}"))?;
    tracing::info!(version = %version, "release tagged");

    let version_file = match version_root {
        None => SideEffect::skipped("release.bump_version_file is off"),
        Some(root) => match detect_version_file(root) {
            None => SideEffect::skipped("no pyproject.toml or package.json"),
            Some((path, kind)) => SideEffect::from_result(
                "update version file",
                update_version_file(&path, kind, &version),
            ),
        },
    };
    Ok(TaggedRelease {
        version,
        version_file,
    })
}

/// Tags in the git repository at `repo`.
pub struct GitTagger {
    repo: PathBuf,
}

impl GitTagger {
    pub fn new(repo: &Path) -> Self {
        Self {
            repo: repo.to_path_buf(),
        }
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let bin = which::which("git").map_err(|_| SprintError::Git("git is not on PATH".to_string()))?;
        let output = Command::new(bin)
            .args(args)
            .current_dir(&self.repo)
            .output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SprintError::Git(stderr.trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ReleaseTagger for GitTagger {
    fn existing_tags(&self) -> Result<Vec<String>> {
        let out = self.git(&["tag", "-l"])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn create_tag(&self, tag: &str) -> Result<()> {
        self.git(&["tag", tag]).map(|_| ())
    }
}
