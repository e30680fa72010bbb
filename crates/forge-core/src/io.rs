use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting the vault or generated files.
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

/// Atomic write followed by owner-only permissions on Unix.
/// Used for files that hold API keys.
pub fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    atomic_write(path, data)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Write a file only if it does not already exist. Returns true if written.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, data)?;
    Ok(true)
}

/// Append `text` to `path`, creating the file and its parents if needed.
pub fn append_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    f.write_all(text.as_bytes())?;
    Ok(())
}

/// Replace the span from the start of `start_marker` through the end of
/// `end_marker` inside `content`. Returns `None` when either marker is absent.
pub fn replace_between_markers(
    content: &str,
    start_marker: &str,
    end_marker: &str,
    replacement: &str,
) -> Option<String> {
    let start_pos = content.find(start_marker)?;
    let search_from = start_pos + start_marker.len();
    let end_offset = content[search_from..].find(end_marker)?;
    let end_pos = search_from + end_offset + end_marker.len();

    let mut updated = String::with_capacity(content.len());
    updated.push_str(&content[..start_pos]);
    updated.push_str(replacement);
    updated.push_str(&content[end_pos..]);
    Some(updated)
}

/// Read a file if it exists, `None` otherwise.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Copy a single file, creating the destination's parent directories.
pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(from, to)?;
    Ok(())
}

/// Remove `dir` if it exists and has no entries. Returns true if removed.
pub fn remove_dir_if_empty(dir: &Path) -> Result<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }
    if std::fs::read_dir(dir)?.next().is_some() {
        return Ok(false);
    }
    std::fs::remove_dir(dir)?;
    Ok(true)
}
