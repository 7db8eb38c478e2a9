pub mod error;
pub mod mailer;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Upload bodies are whole files.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::change_events))
        // UI state
        .route(
            "/api/ui-state",
            get(routes::ui_state::get_ui_state).put(routes::ui_state::put_ui_state),
        )
        // Clients
        .route(
            "/api/clients",
            get(routes::clients::list_clients).post(routes::clients::create_client),
        )
        .route(
            "/api/clients/{id}",
            get(routes::clients::get_client)
                .patch(routes::clients::update_client)
                .delete(routes::clients::delete_client),
        )
        // Documents
        .route(
            "/api/clients/{id}/documents",
            get(routes::documents::list_documents).post(routes::documents::upload_document),
        )
        .route(
            "/api/documents/{id}",
            get(routes::documents::get_document).delete(routes::documents::delete_document),
        )
        .route(
            "/api/documents/{id}/content",
            get(routes::documents::read_document),
        )
        .route(
            "/api/universal-documents",
            get(routes::universal::list_universal).post(routes::universal::upload_universal),
        )
        .route(
            "/api/universal-documents/{id}",
            axum::routing::delete(routes::universal::delete_universal),
        )
        // Steps
        .route(
            "/api/clients/{id}/steps",
            get(routes::steps::list_steps)
                .post(routes::steps::create_step)
                .delete(routes::steps::delete_all_steps),
        )
        .route(
            "/api/steps/{id}",
            get(routes::steps::get_step)
                .patch(routes::steps::update_step)
                .delete(routes::steps::delete_step),
        )
        .route("/api/steps/{id}/status", put(routes::steps::set_step_status))
        // Engagements
        .route(
            "/api/engagements",
            get(routes::engagements::list_engagements),
        )
        .route(
            "/api/clients/{id}/engagements",
            post(routes::engagements::send_package),
        )
        .route(
            "/api/clients/{id}/engagements/latest",
            get(routes::engagements::latest_engagement),
        )
        .route(
            "/api/engagements/{id}/status",
            put(routes::engagements::set_engagement_status),
        )
        // Risks
        .route(
            "/api/clients/{id}/risks",
            get(routes::risks::list_risks).post(routes::risks::create_risk),
        )
        .route(
            "/api/risks/{id}",
            get(routes::risks::get_risk)
                .patch(routes::risks::update_risk)
                .delete(routes::risks::delete_risk),
        )
        .route("/api/risks/{id}/status", put(routes::risks::set_risk_status))
        // Deliverables
        .route(
            "/api/clients/{id}/deliverables",
            get(routes::deliverables::list_deliverables)
                .post(routes::deliverables::upload_deliverable),
        )
        .route(
            "/api/deliverables/{id}",
            axum::routing::patch(routes::deliverables::update_deliverable)
                .delete(routes::deliverables::delete_deliverable),
        )
        // Signature requests
        .route(
            "/api/clients/{id}/signature-requests",
            get(routes::signatures::list_signature_requests),
        )
        .route(
            "/api/signature-requests/{id}",
            get(routes::signatures::get_signature_request),
        )
        .route(
            "/api/signature-requests/{id}/status",
            put(routes::signatures::set_signature_status),
        )
        .route(
            "/api/signature-requests/{id}/signed-document",
            put(routes::signatures::set_signed_document),
        )
        .route(
            "/api/signature-requests/{id}/detach-sow",
            post(routes::signatures::detach_sow),
        )
        .route(
            "/api/signature-requests/{id}/detach-nda",
            post(routes::signatures::detach_nda),
        )
        // Stats
        .route("/api/stats", get(routes::stats::get_stats))
        // Server functions
        .route(
            "/api/functions/send-onboarding-email",
            post(routes::functions::send_onboarding_email),
        )
        .route(
            "/api/functions/send-signature-request",
            post(routes::functions::send_signature_request),
        )
        .route(
            "/api/functions/draft-welcome",
            post(routes::functions::draft_welcome),
        )
        .route(
            "/api/functions/project-insight-ai",
            post(routes::functions::project_insight),
        )
        // Objects
        .route(
            "/storage/{bucket}/{*path}",
            get(routes::storage::serve_object),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the API server on `port`.
pub async fn serve(root: PathBuf, port: u16, open_browser: bool) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(root, listener, open_browser).await
}

/// Start the API server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(
    root: PathBuf,
    listener: tokio::net::TcpListener,
    open_browser: bool,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app_state = AppState::open(root)?;
    for w in app_state.config.validate() {
        tracing::warn!("config: {}", w.message);
    }
    let app = build_router(app_state);

    tracing::info!("onboard server listening on http://localhost:{actual_port}");

    if open_browser {
        let url = format!("http://localhost:{actual_port}");
        let _ = open::that(&url);
    }

    axum::serve(listener, app).await?;
    Ok(())
}
