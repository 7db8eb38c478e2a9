use axum::extract::{Path, State};
use axum::Json;
use onboard_core::signature::SignatureRequest;
use onboard_core::types::SignatureStatus;
use serde::Deserialize;
use uuid::Uuid;

use super::steps::StatusBody;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/clients/{id}/signature-requests: empty when the table is
/// missing.
pub async fn list_signature_requests(
    State(app): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Vec<SignatureRequest>>, AppError> {
    let list = app
        .blocking(move |db, _| SignatureRequest::list_for_client(db, client_id))
        .await?;
    Ok(Json(list))
}

pub async fn get_signature_request(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SignatureRequest>, AppError> {
    let req = app
        .blocking(move |db, _| SignatureRequest::get(db, id))
        .await?;
    Ok(Json(req))
}

pub async fn set_signature_status(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusBody>,
) -> Result<Json<SignatureRequest>, AppError> {
    let req = app
        .blocking(move |db, _| {
            let status: SignatureStatus = body.status.parse()?;
            SignatureRequest::update_status(db, id, status)
        })
        .await?;
    app.notify();
    Ok(Json(req))
}

#[derive(Deserialize)]
pub struct SignedDocumentBody {
    #[serde(default)]
    pub url: Option<String>,
}

/// PUT /api/signature-requests/{id}/signed-document
pub async fn set_signed_document(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SignedDocumentBody>,
) -> Result<Json<SignatureRequest>, AppError> {
    let req = app
        .blocking(move |db, _| SignatureRequest::set_signed_document_url(db, id, body.url))
        .await?;
    app.notify();
    Ok(Json(req))
}

/// POST /api/signature-requests/{id}/detach-sow: the document itself is
/// left alone.
pub async fn detach_sow(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SignatureRequest>, AppError> {
    let req = app
        .blocking(move |db, _| SignatureRequest::detach_sow(db, id))
        .await?;
    app.notify();
    Ok(Json(req))
}

pub async fn detach_nda(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SignatureRequest>, AppError> {
    let req = app
        .blocking(move |db, _| SignatureRequest::detach_nda(db, id))
        .await?;
    app.notify();
    Ok(Json(req))
}
