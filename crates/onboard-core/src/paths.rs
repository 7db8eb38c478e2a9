use crate::error::{OnboardError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const ONBOARD_DIR: &str = ".onboard";
pub const CONFIG_FILE: &str = ".onboard/config.yaml";
pub const DATABASE_FILE: &str = ".onboard/onboard.db";
pub const OBJECTS_DIR: &str = ".onboard/objects";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn onboard_dir(root: &Path) -> PathBuf {
    root.join(ONBOARD_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve a configured path: absolute paths are kept, relative ones are
/// joined onto the project root.
pub fn resolve(root: &Path, configured: &str) -> PathBuf {
    let p = Path::new(configured);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

/// Reduce an uploaded file name to a safe single path segment.
///
/// Keeps ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
/// Leading dots are stripped so the result is never hidden or `..`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

// ---------------------------------------------------------------------------
// Email validation
// ---------------------------------------------------------------------------

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

pub fn validate_email(email: &str) -> Result<()> {
    if email.len() > 254 || !email_re().is_match(email) {
        return Err(OnboardError::InvalidInput(format!(
            "invalid email address '{email}'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_emails() {
        for email in ["a@b.co", "jane.doe+onboard@acme.example.com"] {
            validate_email(email).unwrap_or_else(|_| panic!("expected valid: {email}"));
        }
    }

    #[test]
    fn invalid_emails() {
        for email in ["", "plain", "a@b", "two@@ats.com", "space @x.com"] {
            assert!(validate_email(email).is_err(), "expected invalid: {email}");
        }
    }

    #[test]
    fn sanitize_strips_directories_and_dots() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("Acme SOW (v2).pdf"), "Acme_SOW__v2_.pdf");
        assert_eq!(sanitize_file_name("..."), "file");
        assert_eq!(sanitize_file_name(".env"), "env");
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.onboard/config.yaml")
        );
        assert_eq!(
            resolve(root, ".onboard/onboard.db"),
            PathBuf::from("/tmp/proj/.onboard/onboard.db")
        );
        assert_eq!(resolve(root, "/var/db.sqlite"), PathBuf::from("/var/db.sqlite"));
    }
}
