use crate::error::{OnboardError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_objects_dir")]
    pub objects_dir: String,
    /// Prefix for public object URLs; the server mounts objects at `/storage`.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_database() -> String {
    paths::DATABASE_FILE.to_string()
}

fn default_objects_dir() -> String {
    paths::OBJECTS_DIR.to_string()
}

fn default_public_base_url() -> String {
    "/storage".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            objects_dir: default_objects_dir(),
            public_base_url: default_public_base_url(),
        }
    }
}

// ---------------------------------------------------------------------------
// CascadePolicy
// ---------------------------------------------------------------------------

/// What happens to a client's risks, deliverables and signature requests
/// when the client is deleted. Documents, steps and engagements always
/// cascade through foreign keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadePolicy {
    #[default]
    Cascade,
    Orphan,
}

impl fmt::Display for CascadePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CascadePolicy::Cascade => "cascade",
            CascadePolicy::Orphan => "orphan",
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CascadeConfig {
    #[serde(default)]
    pub policy: CascadePolicy,
}

// ---------------------------------------------------------------------------
// AiConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default = "default_ai_model")]
    pub model: String,
    /// Name of the environment variable holding the provider key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_ai_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_api_key_env() -> String {
    "ONBOARD_AI_KEY".to_string()
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: default_ai_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl AiConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
    }
}

// ---------------------------------------------------------------------------
// MailConfig / SigningConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Delivery webhook. Without one, outgoing mail is only logged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default = "default_mail_from")]
    pub from: String,
}

fn default_mail_from() -> String {
    "onboarding@localhost".to_string()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            from: default_mail_from(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    #[serde(default = "default_signing_base")]
    pub base_url: String,
}

fn default_signing_base() -> String {
    "http://localhost:3141".to_string()
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            base_url: default_signing_base(),
        }
    }
}

impl SigningConfig {
    /// Link to the standalone signing view for a request.
    pub fn link_for(&self, request_id: uuid::Uuid) -> String {
        format!("{}/#/sign/{request_id}", self.base_url.trim_end_matches('/'))
    }
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cascade: CascadeConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub signing: SigningConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            storage: StorageConfig::default(),
            cascade: CascadeConfig::default(),
            ai: AiConfig::default(),
            mail: MailConfig::default(),
            signing: SigningConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(OnboardError::NotInitialized);
        }
        Ok(serde_yaml::from_str(&std::fs::read_to_string(&path)?)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn database_path(&self, root: &Path) -> std::path::PathBuf {
        paths::resolve(root, &self.storage.database)
    }

    pub fn objects_dir(&self, root: &Path) -> std::path::PathBuf {
        paths::resolve(root, &self.storage.objects_dir)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut flag = |level: WarnLevel, message: String| {
            warnings.push(ConfigWarning { level, message });
        };

        if self.version != 1 {
            flag(
                WarnLevel::Error,
                format!("unsupported config version {}", self.version),
            );
        }
        if self.project.name.trim().is_empty() {
            flag(WarnLevel::Error, "project.name is empty".into());
        }

        match self.ai.endpoint.as_deref() {
            None => flag(
                WarnLevel::Warning,
                "ai.endpoint is not set; welcome drafts and insights are disabled".into(),
            ),
            Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => flag(
                WarnLevel::Error,
                format!("ai.endpoint '{url}' is not an http(s) URL"),
            ),
            Some(_) => {}
        }

        if self.mail.webhook_url.is_none() {
            flag(
                WarnLevel::Warning,
                "mail.webhook_url is not set; outgoing mail is logged only".into(),
            );
        }
        if self.cascade.policy == CascadePolicy::Orphan {
            flag(
                WarnLevel::Warning,
                "cascade.policy is 'orphan'; deleting a client leaves its risks, \
                 deliverables and signature requests behind"
                    .into(),
            );
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn minimal_yaml_fills_defaults() {
        let cfg: Config = serde_yaml::from_str("project:\n  name: acme\n").unwrap();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.storage.database, ".onboard/onboard.db");
        assert_eq!(cfg.cascade.policy, CascadePolicy::Cascade);
        assert_eq!(cfg.ai.api_key_env, "ONBOARD_AI_KEY");
        assert!(cfg.mail.webhook_url.is_none());
    }

    #[test]
    fn orphan_policy_parses() {
        let cfg: Config =
            serde_yaml::from_str("project:\n  name: acme\ncascade:\n  policy: orphan\n").unwrap();
        assert_eq!(cfg.cascade.policy, CascadePolicy::Orphan);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("acme");
        cfg.ai.endpoint = Some("http://localhost:9000/generate".into());
        cfg.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.project.name, "acme");
        assert_eq!(
            loaded.ai.endpoint.as_deref(),
            Some("http://localhost:9000/generate")
        );
    }

    #[test]
    fn load_without_file_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(OnboardError::NotInitialized)
        ));
    }

    #[test]
    fn validate_flags_missing_endpoint_and_bad_url() {
        let mut cfg = Config::new("acme");
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("ai.endpoint is not set")));

        cfg.ai.endpoint = Some("ftp://nope".into());
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("ftp://nope")));
    }

    #[test]
    fn signing_link_uses_hash_route() {
        let signing = SigningConfig {
            base_url: "https://portal.example.com/".into(),
        };
        let id = uuid::Uuid::nil();
        assert_eq!(
            signing.link_for(id),
            "https://portal.example.com/#/sign/00000000-0000-0000-0000-000000000000"
        );
    }
}
