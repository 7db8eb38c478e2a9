use axum::extract::{Query, State};
use axum::Json;
use onboard_core::stats::{self, Dashboard};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub client_id: Option<Uuid>,
}

/// GET /api/stats?client_id=: monthly growth is always global.
pub async fn get_stats(
    State(app): State<AppState>,
    Query(q): Query<StatsQuery>,
) -> Result<Json<Dashboard>, AppError> {
    let now = chrono::Utc::now();
    let dashboard = app
        .blocking(move |db, _| stats::dashboard(db, q.client_id, now))
        .await?;
    Ok(Json(dashboard))
}
