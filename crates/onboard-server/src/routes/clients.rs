use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use onboard_core::cascade::{self, CascadeReport};
use onboard_core::client::{Client, ClientUpdate, NewClient};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/clients: all clients ordered by name.
pub async fn list_clients(State(app): State<AppState>) -> Result<Json<Vec<Client>>, AppError> {
    let clients = app.blocking(|db, _| Client::list(db)).await?;
    Ok(Json(clients))
}

/// POST /api/clients: 409 when the name is taken.
pub async fn create_client(
    State(app): State<AppState>,
    Json(body): Json<NewClient>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    let client = app.blocking(move |db, _| Client::create(db, body)).await?;
    app.notify();
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn get_client(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, AppError> {
    let client = app.blocking(move |db, _| Client::get(db, id)).await?;
    Ok(Json(client))
}

/// PATCH /api/clients/{id}
pub async fn update_client(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ClientUpdate>,
) -> Result<Json<Client>, AppError> {
    let client = app
        .blocking(move |db, _| Client::update(db, id, body))
        .await?;
    app.notify();
    Ok(Json(client))
}

/// DELETE /api/clients/{id}: cascades per the configured policy and drops
/// the client from the UI selection.
pub async fn delete_client(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CascadeReport>, AppError> {
    let policy = app.config.cascade.policy;
    let report = app
        .blocking(move |db, store| cascade::delete_client(db, store, id, policy))
        .await?;
    app.ui.write().await.client_deleted(id);
    app.notify();
    Ok(Json(report))
}
