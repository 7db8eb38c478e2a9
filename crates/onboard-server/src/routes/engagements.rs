use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use onboard_core::client::Client;
use onboard_core::engagement::{ClientEngagement, NewEngagement};
use onboard_core::types::EngagementStatus;
use serde::Deserialize;
use uuid::Uuid;

use super::steps::StatusBody;
use crate::error::AppError;
use crate::mailer::OutgoingMail;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub client_id: Option<Uuid>,
}

/// GET /api/engagements?client_id=: newest first.
pub async fn list_engagements(
    State(app): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<ClientEngagement>>, AppError> {
    let list = app
        .blocking(move |db, _| ClientEngagement::list(db, q.client_id))
        .await?;
    Ok(Json(list))
}

pub async fn latest_engagement(
    State(app): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Option<ClientEngagement>>, AppError> {
    let latest = app
        .blocking(move |db, _| ClientEngagement::latest_for_client(db, client_id))
        .await?;
    Ok(Json(latest))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPackageBody {
    pub client_email: String,
    pub welcome_message: String,
    #[serde(default)]
    pub subject: Option<String>,
}

/// POST /api/clients/{id}/engagements: email the welcome package, then
/// record the engagement as `sent`. Nothing is recorded if delivery fails.
pub async fn send_package(
    State(app): State<AppState>,
    Path(client_id): Path<Uuid>,
    Json(body): Json<SendPackageBody>,
) -> Result<(StatusCode, Json<ClientEngagement>), AppError> {
    let client = app.blocking(move |db, _| Client::get(db, client_id)).await?;
    let mail = OutgoingMail {
        to: body.client_email.clone(),
        subject: body
            .subject
            .unwrap_or_else(|| format!("Welcome aboard, {}", client.name)),
        html: body.welcome_message.clone(),
    };
    app.mailer.send(&mail).await?;

    let engagement = app
        .blocking(move |db, _| {
            ClientEngagement::create(
                db,
                client_id,
                NewEngagement {
                    client_email: body.client_email,
                    welcome_message: body.welcome_message,
                    status: Some(EngagementStatus::Sent),
                },
            )
        })
        .await?;
    app.notify();
    Ok((StatusCode::CREATED, Json(engagement)))
}

pub async fn set_engagement_status(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusBody>,
) -> Result<Json<ClientEngagement>, AppError> {
    let engagement = app
        .blocking(move |db, _| {
            let status: EngagementStatus = body.status.parse()?;
            ClientEngagement::update_status(db, id, status)
        })
        .await?;
    app.notify();
    Ok(Json(engagement))
}
