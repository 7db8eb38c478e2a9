use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use onboard_core::step::{NewStep, OnboardingStep, StepUpdate};
use onboard_core::types::StepStatus;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Status changes arrive as plain strings so unknown values surface as
/// a domain `InvalidStatus` (400) rather than a body rejection.
#[derive(Deserialize)]
pub struct StatusBody {
    pub status: String,
}

/// GET /api/clients/{id}/steps: ordered by `order_index`.
pub async fn list_steps(
    State(app): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Vec<OnboardingStep>>, AppError> {
    let steps = app
        .blocking(move |db, _| OnboardingStep::list_for_client(db, client_id))
        .await?;
    Ok(Json(steps))
}

pub async fn create_step(
    State(app): State<AppState>,
    Path(client_id): Path<Uuid>,
    Json(body): Json<NewStep>,
) -> Result<(StatusCode, Json<OnboardingStep>), AppError> {
    let step = app
        .blocking(move |db, _| OnboardingStep::create(db, client_id, body))
        .await?;
    app.notify();
    Ok((StatusCode::CREATED, Json(step)))
}

/// DELETE /api/clients/{id}/steps: returns how many were removed.
pub async fn delete_all_steps(
    State(app): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = app
        .blocking(move |db, _| OnboardingStep::delete_all_for_client(db, client_id))
        .await?;
    app.notify();
    Ok(Json(serde_json::json!({ "removed": removed })))
}

pub async fn get_step(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OnboardingStep>, AppError> {
    let step = app.blocking(move |db, _| OnboardingStep::get(db, id)).await?;
    Ok(Json(step))
}

pub async fn update_step(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StepUpdate>,
) -> Result<Json<OnboardingStep>, AppError> {
    let step = app
        .blocking(move |db, _| OnboardingStep::update(db, id, body))
        .await?;
    app.notify();
    Ok(Json(step))
}

/// PUT /api/steps/{id}/status: any status may follow any other.
pub async fn set_step_status(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusBody>,
) -> Result<Json<OnboardingStep>, AppError> {
    let step = app
        .blocking(move |db, _| {
            let status: StepStatus = body.status.parse()?;
            OnboardingStep::update_status(db, id, status)
        })
        .await?;
    app.notify();
    Ok(Json(step))
}

pub async fn delete_step(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app.blocking(move |db, _| OnboardingStep::delete(db, id))
        .await?;
    app.notify();
    Ok(StatusCode::NO_CONTENT)
}
