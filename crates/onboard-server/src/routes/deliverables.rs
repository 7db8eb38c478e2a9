use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use onboard_core::deliverable::{ClientDeliverable, DeliverableUpdate, NewDeliverable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::documents::{content_type, require_file, WithUrl};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct MilestoneView {
    pub milestone_name: String,
    pub deliverables: Vec<WithUrl<ClientDeliverable>>,
}

/// GET /api/clients/{id}/deliverables: grouped by milestone.
pub async fn list_deliverables(
    State(app): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Vec<MilestoneView>>, AppError> {
    let groups = app
        .blocking(move |db, store| {
            let groups = ClientDeliverable::grouped_for_client(db, client_id)?;
            Ok(groups
                .into_iter()
                .map(|g| MilestoneView {
                    milestone_name: g.milestone_name,
                    deliverables: g
                        .deliverables
                        .into_iter()
                        .map(|d| WithUrl {
                            url: d.public_url(store),
                            item: d,
                        })
                        .collect(),
                })
                .collect::<Vec<_>>())
        })
        .await?;
    Ok(Json(groups))
}

#[derive(Deserialize)]
pub struct UploadQuery {
    pub file_name: String,
    pub milestone_name: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// POST /api/clients/{id}/deliverables?file_name=&milestone_name=&title=
pub async fn upload_deliverable(
    State(app): State<AppState>,
    Path(client_id): Path<Uuid>,
    Query(q): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WithUrl<ClientDeliverable>>), AppError> {
    require_file(&q.file_name, &body)?;
    let ct = content_type(&headers);
    let d = app
        .blocking(move |db, store| {
            let d = ClientDeliverable::upload(
                db,
                store,
                client_id,
                NewDeliverable {
                    milestone_name: q.milestone_name,
                    title: q.title,
                    description: q.description,
                    version: q.version,
                },
                onboard_core::upload::FileUpload {
                    file_name: &q.file_name,
                    content_type: ct.as_deref(),
                    data: &body,
                },
            )?;
            Ok(WithUrl {
                url: d.public_url(store),
                item: d,
            })
        })
        .await?;
    app.notify();
    Ok((StatusCode::CREATED, Json(d)))
}

/// PATCH /api/deliverables/{id}: metadata only.
pub async fn update_deliverable(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<DeliverableUpdate>,
) -> Result<Json<ClientDeliverable>, AppError> {
    let d = app
        .blocking(move |db, _| ClientDeliverable::update(db, id, body))
        .await?;
    app.notify();
    Ok(Json(d))
}

pub async fn delete_deliverable(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app.blocking(move |db, store| ClientDeliverable::delete(db, store, id))
        .await?;
    app.notify();
    Ok(StatusCode::NO_CONTENT)
}
