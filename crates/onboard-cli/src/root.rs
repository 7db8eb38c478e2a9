use std::path::{Path, PathBuf};

use onboard_core::paths::ONBOARD_DIR;

/// The workspace a command operates on: an explicit `--root` /
/// `ONBOARD_ROOT`, else the nearest ancestor holding `.onboard/`, else the
/// current directory (so `init` can create one there).
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(root) => root.to_path_buf(),
        None => {
            let here = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            find_upward(&here).unwrap_or(here)
        }
    }
}

fn find_upward(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(ONBOARD_DIR).is_dir())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn finds_onboard_dir_above_start() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".onboard")).unwrap();
        let subdir = dir.path().join("docs/contracts");
        std::fs::create_dir_all(&subdir).unwrap();
        assert_eq!(find_upward(&subdir).as_deref(), Some(dir.path()));
    }

    #[test]
    fn no_marker_means_none() {
        let dir = TempDir::new().unwrap();
        assert!(find_upward(dir.path()).is_none());
    }
}
