use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use onboard_ai::AiError;
use onboard_core::OnboardError;

use crate::mailer::MailError;

// ---------------------------------------------------------------------------
// Internal sentinel for explicit 400 errors
// ---------------------------------------------------------------------------

/// Carries an explicit HTTP 400 through the `anyhow::Error` chain for
/// request-shape problems that never reach the domain layer.
#[derive(Debug)]
struct BadRequest(String);

impl std::fmt::Display for BadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequest {}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequest(msg.into()).into())
    }

    fn status(&self) -> StatusCode {
        if self.0.downcast_ref::<BadRequest>().is_some() {
            return StatusCode::BAD_REQUEST;
        }
        if let Some(e) = self.0.downcast_ref::<OnboardError>() {
            return match e {
                OnboardError::ClientNotFound(_)
                | OnboardError::DocumentNotFound(_)
                | OnboardError::StepNotFound(_)
                | OnboardError::EngagementNotFound(_)
                | OnboardError::RiskNotFound(_)
                | OnboardError::DeliverableNotFound(_)
                | OnboardError::SignatureRequestNotFound(_) => StatusCode::NOT_FOUND,
                OnboardError::ClientNameTaken(_) => StatusCode::CONFLICT,
                OnboardError::InvalidStatus { .. }
                | OnboardError::InvalidInput(_)
                | OnboardError::NotInitialized => StatusCode::BAD_REQUEST,
                OnboardError::SignatureTableMissing => StatusCode::SERVICE_UNAVAILABLE,
                OnboardError::Storage(_)
                | OnboardError::Database(_)
                | OnboardError::Io(_)
                | OnboardError::Yaml(_)
                | OnboardError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
        }
        if let Some(e) = self.0.downcast_ref::<AiError>() {
            return match e {
                AiError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                AiError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
                AiError::Http(_)
                | AiError::Status { .. }
                | AiError::Malformed(_)
                | AiError::Decode(_) => StatusCode::BAD_GATEWAY,
            };
        }
        if let Some(e) = self.0.downcast_ref::<MailError>() {
            return match e {
                MailError::InvalidRecipient(_) => StatusCode::BAD_REQUEST,
                MailError::Http(_) | MailError::Rejected { .. } => StatusCode::BAD_GATEWAY,
            };
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
