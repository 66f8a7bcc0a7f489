use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting sprint and ticket documents.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Rewrite a UTF-8 file through `edit`. Returns `true` if the content changed.
/// Missing files are left alone and report `false`.
pub fn rewrite_text(path: &Path, edit: impl FnOnce(&str) -> Result<String>) -> Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    let content = std::fs::read_to_string(path)?;
    let updated = edit(&content)?;
    if updated == content {
        return Ok(false);
    }
    atomic_write(path, updated.as_bytes())?;
    Ok(true)
}
