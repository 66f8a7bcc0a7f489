//! YAML frontmatter on markdown documents.
//!
//! Sprint and ticket files start with a `---` delimited YAML block followed
//! by free-form markdown. Edits go through [`Document`] so the body is
//! preserved byte for byte while individual keys change.

use serde_yaml::{Mapping, Value};
use std::path::Path;

use crate::error::{Result, SprintError};

/// Split raw content into `(frontmatter, body)`.
///
/// Returns `None` when the content does not open with a `---` line or the
/// closing delimiter is missing.
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---")?;
    let rest = rest
        .strip_prefix('\n')
        .or_else(|| rest.strip_prefix("\r\n"))?;

    let (yaml, after) = if let Some(after) = rest.strip_prefix("---") {
        ("", after)
    } else {
        let end = rest.find("\n---")?;
        (&rest[..=end], &rest[end + 4..])
    };
    let body = after
        .strip_prefix('\n')
        .or_else(|| after.strip_prefix("\r\n"))
        .unwrap_or(after);
    Some((yaml, body))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub frontmatter: Mapping,
    pub body: String,
}

impl Document {
    pub fn new(frontmatter: Mapping, body: impl Into<String>) -> Self {
        Self {
            frontmatter,
            body: body.into(),
        }
    }

    /// Parse a document. Content without frontmatter becomes all body.
    ///
    /// A YAML block that is not a mapping (a list, a bare scalar) is treated
    /// as no frontmatter at all, and the whole content becomes the body.
    pub fn parse(content: &str) -> Result<Self> {
        let Some((yaml, body)) = split_frontmatter(content) else {
            return Ok(Self::new(Mapping::new(), content));
        };
        if yaml.trim().is_empty() {
            return Ok(Self::new(Mapping::new(), body));
        }
        match serde_yaml::from_str::<Value>(yaml)? {
            Value::Mapping(frontmatter) => Ok(Self::new(frontmatter, body)),
            _ => Ok(Self::new(Mapping::new(), content)),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SprintError::File {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn render(&self) -> Result<String> {
        let yaml = if self.frontmatter.is_empty() {
            String::new()
        } else {
            serde_yaml::to_string(&self.frontmatter)?
        };
        Ok(format!("---\n{yaml}---\n{}", self.body))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let rendered = self.render()?;
        crate::io::atomic_write(path, rendered.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Field access
    // -----------------------------------------------------------------------

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.frontmatter.get(key)
    }

    /// Scalar value rendered as a string. Unquoted numbers are accepted so
    /// hand-edited `id: 4` still reads back.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Set a key, keeping its position if it already exists.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.frontmatter
            .insert(Value::String(key.to_string()), value.into());
    }

    pub fn set_list(&mut self, key: &str, items: &[String]) {
        let seq = items.iter().cloned().map(Value::String).collect();
        self.set(key, Value::Sequence(seq));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
