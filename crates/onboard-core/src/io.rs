use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Replace `path` with `data` via a sibling tempfile, creating parent
/// directories first. Objects and config are never seen half-written.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    let mut staged = NamedTempFile::new_in(parent)?;
    staged.write_all(data)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    Ok(std::fs::create_dir_all(path)?)
}

/// Make sure `root/.gitignore` ignores `pattern`. Returns true when the
/// file changed.
pub fn ensure_gitignore_entry(root: &Path, pattern: &str) -> Result<bool> {
    let path = root.join(".gitignore");
    let mut content = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    if content.lines().any(|l| l.trim() == pattern) {
        return Ok(false);
    }
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(pattern);
    content.push('\n');
    atomic_write(&path, content.as_bytes())?;
    Ok(true)
}
