use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use onboard_core::document::UniversalDocument;
use onboard_core::upload::FileUpload;
use serde::Deserialize;
use uuid::Uuid;

use super::documents::{content_type, require_file, WithUrl};
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/universal-documents: newest first.
pub async fn list_universal(
    State(app): State<AppState>,
) -> Result<Json<Vec<WithUrl<UniversalDocument>>>, AppError> {
    let docs = app
        .blocking(|db, store| {
            Ok(UniversalDocument::list(db)?
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
    pub file_name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// POST /api/universal-documents?file_name=&title=&description=
pub async fn upload_universal(
    State(app): State<AppState>,
    Query(q): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WithUrl<UniversalDocument>>), AppError> {
    require_file(&q.file_name, &body)?;
    let ct = content_type(&headers);
    let doc = app
        .blocking(move |db, store| {
            let doc = UniversalDocument::upload(
                db,
                store,
                q.title.as_deref(),
                q.description.as_deref(),
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

pub async fn delete_universal(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app.blocking(move |db, store| UniversalDocument::delete(db, store, id))
        .await?;
    app.notify();
    Ok(StatusCode::NO_CONTENT)
}
