use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use onboard_core::risk::{NewRisk, Priority, Risk, RiskUpdate};
use onboard_core::types::RiskStatus;
use serde::Serialize;
use uuid::Uuid;

use super::steps::StatusBody;
use crate::error::AppError;
use crate::state::AppState;

/// A risk with its computed priority.
#[derive(Debug, Serialize)]
pub struct ScoredRisk {
    #[serde(flatten)]
    pub risk: Risk,
    pub priority: Priority,
}

impl From<Risk> for ScoredRisk {
    fn from(risk: Risk) -> Self {
        Self {
            priority: risk.priority(),
            risk,
        }
    }
}

/// GET /api/clients/{id}/risks: highest priority first.
pub async fn list_risks(
    State(app): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Vec<ScoredRisk>>, AppError> {
    let risks = app
        .blocking(move |db, _| Risk::list_for_client(db, client_id))
        .await?;
    Ok(Json(risks.into_iter().map(ScoredRisk::from).collect()))
}

pub async fn create_risk(
    State(app): State<AppState>,
    Path(client_id): Path<Uuid>,
    Json(body): Json<NewRisk>,
) -> Result<(StatusCode, Json<ScoredRisk>), AppError> {
    let risk = app
        .blocking(move |db, _| Risk::create(db, client_id, body))
        .await?;
    app.notify();
    Ok((StatusCode::CREATED, Json(risk.into())))
}

pub async fn get_risk(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScoredRisk>, AppError> {
    let risk = app.blocking(move |db, _| Risk::get(db, id)).await?;
    Ok(Json(risk.into()))
}

pub async fn update_risk(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RiskUpdate>,
) -> Result<Json<ScoredRisk>, AppError> {
    let risk = app.blocking(move |db, _| Risk::update(db, id, body)).await?;
    app.notify();
    Ok(Json(risk.into()))
}

pub async fn set_risk_status(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusBody>,
) -> Result<Json<ScoredRisk>, AppError> {
    let risk = app
        .blocking(move |db, _| {
            let status: RiskStatus = body.status.parse()?;
            Risk::update_status(db, id, status)
        })
        .await?;
    app.notify();
    Ok(Json(risk.into()))
}

pub async fn delete_risk(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app.blocking(move |db, _| Risk::delete(db, id)).await?;
    app.notify();
    Ok(StatusCode::NO_CONTENT)
}
