use axum::extract::State;
use axum::Json;
use onboard_core::view::UiState;

use crate::state::AppState;

pub async fn get_ui_state(State(app): State<AppState>) -> Json<UiState> {
    Json(app.ui.read().await.clone())
}

/// PUT /api/ui-state: replaces the whole value.
pub async fn put_ui_state(State(app): State<AppState>, Json(body): Json<UiState>) -> Json<UiState> {
    *app.ui.write().await = body.clone();
    app.notify();
    Json(body)
}
