use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum OnboardError {
    #[error("not initialized: run 'onboard init'")]
    NotInitialized,

    #[error("client not found: {0}")]
    ClientNotFound(Uuid),

    #[error("client name already taken: {0}")]
    ClientNameTaken(String),

    #[error("document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("onboarding step not found: {0}")]
    StepNotFound(Uuid),

    #[error("engagement not found: {0}")]
    EngagementNotFound(Uuid),

    #[error("risk not found: {0}")]
    RiskNotFound(Uuid),

    #[error("deliverable not found: {0}")]
    DeliverableNotFound(Uuid),

    #[error("signature request not found: {0}")]
    SignatureRequestNotFound(Uuid),

    #[error("signature requests table does not exist; run migrations")]
    SignatureTableMissing,

    #[error("invalid {kind} '{value}'")]
    InvalidStatus { kind: &'static str, value: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OnboardError>;
