use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use onboard_core::config::Config;
use onboard_core::db::Db;
use onboard_core::storage::FsObjectStore;
use onboard_server::state::AppState;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn test_config() -> Config {
    let mut config = Config::new("test-project");
    config.ai.api_key_env = "ONBOARD_TEST_UNSET_KEY".into();
    config
}

fn state_with(dir: &TempDir, config: Config) -> AppState {
    AppState::from_parts(
        dir.path().to_path_buf(),
        config,
        Db::open_in_memory().unwrap(),
        Arc::new(FsObjectStore::new(dir.path().join("objects"), "/storage")),
    )
}

fn router(state: &AppState) -> axum::Router {
    onboard_server::build_router(state.clone())
}

async fn send(app: axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, req).await
}

async fn with_json(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Value,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(app, req).await
}

async fn upload(
    app: axum::Router,
    uri: &str,
    content_type: &str,
    data: &'static [u8],
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(data))
        .unwrap();
    send(app, req).await
}

async fn create_client(state: &AppState, name: &str) -> String {
    let (status, body) =
        with_json(router(state), "POST", "/api/clients", json!({ "name": name })).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clients_crud_and_conflicts() {
    let dir = TempDir::new().unwrap();
    let state = state_with(&dir, test_config());

    let acme = create_client(&state, "Acme").await;
    create_client(&state, "Beta").await;

    let (status, body) =
        with_json(router(&state), "POST", "/api/clients", json!({ "name": "Acme" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Acme"));

    let (status, body) = get(router(&state), "/api/clients").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Acme", "Beta"]);

    let (status, body) = with_json(
        router(&state),
        "PATCH",
        &format!("/api/clients/{acme}"),
        json!({ "app_url": "https://acme.test" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["app_url"], "https://acme.test");

    let (status, _) = get(
        router(&state),
        "/api/clients/00000000-0000-0000-0000-000000000000",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_client_cascades_and_clears_selection() {
    let dir = TempDir::new().unwrap();
    let state = state_with(&dir, test_config());
    let id = create_client(&state, "Acme").await;

    let (status, _) = with_json(
        router(&state),
        "POST",
        &format!("/api/clients/{id}/risks"),
        json!({ "title": "Scope", "severity": "high", "likelihood": "low" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = with_json(
        router(&state),
        "PUT",
        "/api/ui-state",
        json!({ "selected_client": id, "view": { "kind": "client", "id": id } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/api/clients/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, report) = send(router(&state), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["risks_removed"], 1);

    let (_, ui) = get(router(&state), "/api/ui-state").await;
    assert_eq!(ui["selected_client"], Value::Null);
    assert_eq!(ui["view"]["kind"], "clients");

    let (status, _) = get(router(&state), &format!("/api/clients/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Steps and risks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn step_status_rejects_unknown_value() {
    let dir = TempDir::new().unwrap();
    let state = state_with(&dir, test_config());
    let id = create_client(&state, "Acme").await;

    let (status, step) = with_json(
        router(&state),
        "POST",
        &format!("/api/clients/{id}/steps"),
        json!({ "title": "Kickoff" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(step["status"], "not_started");
    let step_id = step["id"].as_str().unwrap();

    let (status, body) = with_json(
        router(&state),
        "PUT",
        &format!("/api/steps/{step_id}/status"),
        json!({ "status": "finished" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("finished"));

    let (status, body) = with_json(
        router(&state),
        "PUT",
        &format!("/api/steps/{step_id}/status"),
        json!({ "status": "completed" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
}

#[tokio::test]
async fn risks_come_back_highest_priority_first() {
    let dir = TempDir::new().unwrap();
    let state = state_with(&dir, test_config());
    let id = create_client(&state, "Acme").await;

    for (title, severity, likelihood) in [
        ("minor", "low", "low"),
        ("outage", "critical", "high"),
        ("delay", "medium", "medium"),
    ] {
        let (status, _) = with_json(
            router(&state),
            "POST",
            &format!("/api/clients/{id}/risks"),
            json!({ "title": title, "severity": severity, "likelihood": likelihood }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = get(router(&state), &format!("/api/clients/{id}/risks")).await;
    assert_eq!(status, StatusCode::OK);
    let risks = body.as_array().unwrap();
    assert_eq!(risks[0]["title"], "outage");
    assert_eq!(risks[0]["priority"]["score"], 12);
    assert_eq!(risks[0]["priority"]["level"], "Critical");
    assert_eq!(risks[1]["title"], "delay");
    assert_eq!(risks[2]["priority"]["level"], "Low");
}

// ---------------------------------------------------------------------------
// Documents and storage
// ---------------------------------------------------------------------------

#[tokio::test]
async fn uploaded_document_is_served_from_its_public_url() {
    let dir = TempDir::new().unwrap();
    let state = state_with(&dir, test_config());
    let id = create_client(&state, "Acme").await;

    let (status, doc) = upload(
        router(&state),
        &format!("/api/clients/{id}/documents?type=sow&file_name=sow.pdf"),
        "application/pdf",
        b"%PDF-1.4",
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{doc}");
    assert_eq!(doc["file_size"], 8);
    let url = doc["url"].as_str().unwrap();
    assert!(url.starts_with("/storage/sow-documents/"));

    let response = router(&state)
        .oneshot(Request::builder().uri(url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/pdf");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"%PDF-1.4");

    let (status, _) = get(router(&state), "/storage/nope/x.pdf").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_without_file_name_is_rejected() {
    let dir = TempDir::new().unwrap();
    let state = state_with(&dir, test_config());
    let id = create_client(&state, "Acme").await;

    let (status, _) = upload(
        router(&state),
        &format!("/api/clients/{id}/documents?type=sow&file_name="),
        "application/pdf",
        b"x",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deliverables_are_grouped_by_milestone() {
    let dir = TempDir::new().unwrap();
    let state = state_with(&dir, test_config());
    let id = create_client(&state, "Acme").await;

    for (milestone, title) in [("Beta", "Report"), ("Alpha", "Spec"), ("Beta", "Deck")] {
        let (status, _) = upload(
            router(&state),
            &format!(
                "/api/clients/{id}/deliverables?file_name=f.txt&milestone_name={milestone}&title={title}"
            ),
            "text/plain",
            b"content",
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = get(router(&state), &format!("/api/clients/{id}/deliverables")).await;
    assert_eq!(status, StatusCode::OK);
    let groups = body.as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["milestone_name"], "Alpha");
    assert_eq!(groups[1]["deliverables"].as_array().unwrap().len(), 2);
    assert_eq!(groups[1]["deliverables"][0]["version"], "1.0");
}

// ---------------------------------------------------------------------------
// Mail-backed actions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_package_records_engagement_after_mail() {
    let mut server = mockito::Server::new_async().await;
    let hook = server
        .mock("POST", "/mail")
        .match_body(mockito::Matcher::PartialJson(json!({ "to": "ceo@acme.test" })))
        .with_status(202)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config();
    config.mail.webhook_url = Some(format!("{}/mail", server.url()));
    let state = state_with(&dir, config);
    let id = create_client(&state, "Acme").await;

    let (status, body) = with_json(
        router(&state),
        "POST",
        &format!("/api/clients/{id}/engagements"),
        json!({ "clientEmail": "ceo@acme.test", "welcomeMessage": "Welcome!" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "sent");
    assert!(body["email_sent_at"].is_string());
    hook.assert_async().await;

    let (_, latest) = get(
        router(&state),
        &format!("/api/clients/{id}/engagements/latest"),
    )
    .await;
    assert_eq!(latest["id"], body["id"]);
}

#[tokio::test]
async fn rejected_mail_records_nothing() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/mail")
        .with_status(500)
        .with_body("down")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config();
    config.mail.webhook_url = Some(format!("{}/mail", server.url()));
    let state = state_with(&dir, config);
    let id = create_client(&state, "Acme").await;

    let (status, _) = with_json(
        router(&state),
        "POST",
        &format!("/api/clients/{id}/engagements"),
        json!({ "clientEmail": "ceo@acme.test", "welcomeMessage": "Welcome!" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, list) = get(router(&state), &format!("/api/engagements?client_id={id}")).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn signature_request_flow() {
    let dir = TempDir::new().unwrap();
    let state = state_with(&dir, test_config());
    let id = create_client(&state, "Acme").await;

    let (status, _) = with_json(
        router(&state),
        "POST",
        "/api/functions/send-signature-request",
        json!({
            "clientId": id,
            "recipientName": "Ada",
            "recipientEmail": "ada@acme.test"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, doc) = upload(
        router(&state),
        &format!("/api/clients/{id}/documents?type=sow&file_name=sow.pdf"),
        "application/pdf",
        b"%PDF",
    )
    .await;
    let (status, req) = with_json(
        router(&state),
        "POST",
        "/api/functions/send-signature-request",
        json!({
            "clientId": id,
            "sowDocumentId": doc["id"],
            "recipientName": "Ada",
            "recipientEmail": "ada@acme.test"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{req}");
    assert_eq!(req["status"], "sent");
    let req_id = req["id"].as_str().unwrap();

    let (status, detached) = with_json(
        router(&state),
        "POST",
        &format!("/api/signature-requests/{req_id}/detach-sow"),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detached["sow_document_id"], Value::Null);

    let (status, signed) = with_json(
        router(&state),
        "PUT",
        &format!("/api/signature-requests/{req_id}/status"),
        json!({ "status": "signed" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(signed["signed_at"].is_string());

    let (_, list) = get(
        router(&state),
        &format!("/api/clients/{id}/signature-requests"),
    )
    .await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Generative text
// ---------------------------------------------------------------------------

#[tokio::test]
async fn draft_welcome_without_provider_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let state = state_with(&dir, test_config());
    let id = create_client(&state, "Acme").await;

    let (status, _) = with_json(
        router(&state),
        "POST",
        "/api/functions/draft-welcome",
        json!({ "clientId": id, "sowText": "Build an app" }),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn draft_welcome_can_create_steps() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(200)
        .with_body(
            json!({
                "text": "```json\n{\"welcomeMessage\":\"Hi Acme\",\"nextSteps\":[\"Kickoff\",\"Access\"]}\n```"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config();
    config.ai.endpoint = Some(server.url());
    let state = state_with(&dir, config);
    let id = create_client(&state, "Acme").await;

    let (status, body) = with_json(
        router(&state),
        "POST",
        "/api/functions/draft-welcome",
        json!({ "clientId": id, "sowText": "Build an app", "createSteps": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["welcomeMessage"], "Hi Acme");
    assert_eq!(body["createdSteps"].as_array().unwrap().len(), 2);

    let (_, steps) = get(router(&state), &format!("/api/clients/{id}/steps")).await;
    let titles: Vec<_> = steps
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Kickoff", "Access"]);
}

#[tokio::test]
async fn project_insight_streams_plain_text() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/")
        .match_body(mockito::Matcher::PartialJson(json!({ "stream": true })))
        .with_status(200)
        .with_body("Two steps remain.")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config();
    config.ai.endpoint = Some(server.url());
    let state = state_with(&dir, config);
    let id = create_client(&state, "Acme").await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/functions/project-insight-ai")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "clientId": id, "userQuery": "Status?" }).to_string(),
        ))
        .unwrap();
    let response = router(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"Two steps remain.");
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stats_dashboard_shape() {
    let dir = TempDir::new().unwrap();
    let state = state_with(&dir, test_config());
    create_client(&state, "Acme").await;

    let (status, body) = get(router(&state), "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client_count"], 1);
    assert_eq!(body["steps"]["total"], 0);
    assert_eq!(body["average_onboarding_days"], 0.0);
    let growth = body["monthly_growth"].as_array().unwrap();
    assert_eq!(growth.len(), 12);
    assert_eq!(growth[11]["client_count"], 1);
}
