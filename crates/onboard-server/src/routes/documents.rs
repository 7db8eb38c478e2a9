use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use onboard_core::document::ClientDocument;
use onboard_core::types::DocumentType;
use onboard_core::upload::FileUpload;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// A stored record together with where its file can be fetched.
#[derive(Debug, Serialize)]
pub struct WithUrl<T> {
    #[serde(flatten)]
    pub item: T,
    pub url: String,
}

/// The uploaded file's declared content type, if any.
pub(crate) fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub(crate) fn require_file(file_name: &str, body: &[u8]) -> Result<(), AppError> {
    if file_name.trim().is_empty() {
        return Err(AppError::bad_request("file_name is required"));
    }
    if body.is_empty() {
        return Err(AppError::bad_request("request body is empty"));
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default, rename = "type")]
    pub document_type: Option<DocumentType>,
}

/// GET /api/clients/{id}/documents?type=sow
pub async fn list_documents(
    State(app): State<AppState>,
    Path(client_id): Path<Uuid>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<WithUrl<ClientDocument>>>, AppError> {
    let docs = app
        .blocking(move |db, store| {
            let docs = ClientDocument::list_for_client(db, client_id, q.document_type)?;
            Ok(docs
                .into_iter()
                .map(|d| WithUrl {
                    url: d.public_url(store),
                    item: d,
                })
                .collect::<Vec<_>>())
        })
        .await?;
    Ok(Json(docs))
}

#[derive(Deserialize)]
pub struct UploadQuery {
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    pub file_name: String,
}

/// POST /api/clients/{id}/documents?type=sow&file_name=sow.pdf: the
/// request body is the file.
pub async fn upload_document(
    State(app): State<AppState>,
    Path(client_id): Path<Uuid>,
    Query(q): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WithUrl<ClientDocument>>), AppError> {
    require_file(&q.file_name, &body)?;
    let ct = content_type(&headers);
    let doc = app
        .blocking(move |db, store| {
            let doc = ClientDocument::upload(
                db,
                store,
                client_id,
                q.document_type,
                FileUpload {
                    file_name: &q.file_name,
                    content_type: ct.as_deref(),
                    data: &body,
                },
            )?;
            Ok(WithUrl {
                url: doc.public_url(store),
                item: doc,
            })
        })
        .await?;
    app.notify();
    Ok((StatusCode::CREATED, Json(doc)))
}

pub async fn get_document(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WithUrl<ClientDocument>>, AppError> {
    let doc = app
        .blocking(move |db, store| {
            let doc = ClientDocument::get(db, id)?;
            Ok(WithUrl {
                url: doc.public_url(store),
                item: doc,
            })
        })
        .await?;
    Ok(Json(doc))
}

/// GET /api/documents/{id}/content: the raw file.
pub async fn read_document(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<([(header::HeaderName, String); 1], Vec<u8>), AppError> {
    let (content_type, data) = app
        .blocking(move |db, store| {
            let doc = ClientDocument::get(db, id)?;
            let data = doc.read(store)?;
            Ok((doc.content_type, data))
        })
        .await?;
    Ok(([(header::CONTENT_TYPE, content_type)], data))
}

pub async fn delete_document(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app.blocking(move |db, store| ClientDocument::delete(db, store, id))
        .await?;
    app.notify();
    Ok(StatusCode::NO_CONTENT)
}
