use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::state::AppState;

/// GET /api/events: one `changed` event per store mutation. Lagged
/// receivers skip what they missed; the client refetches anyway.
pub async fn change_events(State(app): State<AppState>) -> impl IntoResponse {
    let changes = BroadcastStream::new(app.event_tx.subscribe())
        .filter_map(|msg| msg.ok())
        .map(|()| Ok::<_, Infallible>(Event::default().event("changed").data("{}")));
    Sse::new(changes).keep_alive(KeepAlive::default())
}
