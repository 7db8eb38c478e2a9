//! Callable server functions: `POST /api/functions/<name>`.

use std::fmt::Write as _;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use onboard_ai::WelcomeDraft;
use onboard_core::client::Client;
use onboard_core::deliverable::ClientDeliverable;
use onboard_core::engagement::ClientEngagement;
use onboard_core::risk::Risk;
use onboard_core::signature::{NewSignatureRequest, SignatureRequest};
use onboard_core::step::OnboardingStep;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::mailer::{Delivery, OutgoingMail};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// send-onboarding-email
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct MailResult {
    pub delivery: Delivery,
}

pub async fn send_onboarding_email(
    State(app): State<AppState>,
    Json(mail): Json<OutgoingMail>,
) -> Result<Json<MailResult>, AppError> {
    let delivery = app.mailer.send(&mail).await?;
    Ok(Json(MailResult { delivery }))
}

// ---------------------------------------------------------------------------
// send-signature-request
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRequestBody {
    pub client_id: Uuid,
    #[serde(flatten)]
    pub request: NewSignatureRequest,
}

/// Create the request, then mail the signing link. A mail failure leaves
/// the request in place with status `sent`; the error is still returned.
pub async fn send_signature_request(
    State(app): State<AppState>,
    Json(body): Json<SignatureRequestBody>,
) -> Result<(StatusCode, Json<SignatureRequest>), AppError> {
    let client_id = body.client_id;
    let (client, req) = app
        .blocking(move |db, _| {
            let client = Client::get(db, client_id)?;
            let req = SignatureRequest::create(db, client_id, body.request)?;
            Ok((client, req))
        })
        .await?;
    app.notify();

    let link = app.config.signing.link_for(req.id);
    let mail = OutgoingMail {
        to: req.recipient_email.clone(),
        subject: format!("Documents to sign from {}", client.name),
        html: format!(
            "<p>Hello {},</p><p>Please review and sign: <a href=\"{link}\">{link}</a></p>",
            req.recipient_name
        ),
    };
    app.mailer.send(&mail).await?;
    tracing::info!(request = %req.id, client = %client.name, "signature request sent");
    Ok((StatusCode::CREATED, Json(req)))
}

// ---------------------------------------------------------------------------
// draft-welcome
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftBody {
    pub client_id: Uuid,
    pub sow_text: String,
    #[serde(default)]
    pub create_steps: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResult {
    #[serde(flatten)]
    pub draft: WelcomeDraft,
    pub created_steps: Vec<OnboardingStep>,
}

pub async fn draft_welcome(
    State(app): State<AppState>,
    Json(body): Json<DraftBody>,
) -> Result<Json<DraftResult>, AppError> {
    let client_id = body.client_id;
    let client = app.blocking(move |db, _| Client::get(db, client_id)).await?;
    let ai = app.ai()?;
    let draft = onboard_ai::draft_welcome(&ai, &client.name, &body.sow_text).await?;

    let created_steps = if body.create_steps && !draft.next_steps.is_empty() {
        let titles = draft.next_steps.clone();
        let steps = app
            .blocking(move |db, _| OnboardingStep::create_many(db, client_id, &titles))
            .await?;
        app.notify();
        steps
    } else {
        Vec::new()
    };
    Ok(Json(DraftResult {
        draft,
        created_steps,
    }))
}

// ---------------------------------------------------------------------------
// project-insight-ai
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightBody {
    pub client_id: Uuid,
    pub user_query: String,
}

struct ClientSnapshot {
    client: Client,
    steps: Vec<OnboardingStep>,
    risks: Vec<Risk>,
    deliverables: Vec<ClientDeliverable>,
    engagement: Option<ClientEngagement>,
}

fn insight_prompt(snap: &ClientSnapshot, query: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Client: {}", snap.client.name);
    if let Some(e) = &snap.engagement {
        let _ = writeln!(out, "Engagement: {} (contact {})", e.status, e.client_email);
    }
    let _ = writeln!(out, "\nOnboarding steps:");
    for s in &snap.steps {
        let _ = writeln!(out, "- [{}] {}", s.status, s.title);
    }
    let _ = writeln!(out, "\nRisks:");
    for r in &snap.risks {
        let _ = writeln!(
            out,
            "- {} ({}, severity {}, likelihood {})",
            r.title,
            r.status,
            r.severity,
            r.likelihood
        );
    }
    let _ = writeln!(out, "\nDeliverables:");
    for d in &snap.deliverables {
        let _ = writeln!(out, "- {} / {} v{}", d.milestone_name, d.title, d.version);
    }
    let _ = write!(out, "\nQuestion: {query}");
    out
}

/// Streams the provider's answer as `text/plain` chunks. Client disconnect
/// drops the body, which cancels the provider request.
pub async fn project_insight(
    State(app): State<AppState>,
    Json(body): Json<InsightBody>,
) -> Result<Response, AppError> {
    if body.user_query.trim().is_empty() {
        return Err(AppError::bad_request("userQuery is required"));
    }
    let ai = app.ai()?;
    let client_id = body.client_id;
    let snap = app
        .blocking(move |db, _| {
            Ok(ClientSnapshot {
                client: Client::get(db, client_id)?,
                steps: OnboardingStep::list_for_client(db, client_id)?,
                risks: Risk::list_for_client(db, client_id)?,
                deliverables: ClientDeliverable::list_for_client(db, client_id)?,
                engagement: ClientEngagement::latest_for_client(db, client_id)?,
            })
        })
        .await?;

    let stream = ai.stream(insight_prompt(&snap, &body.user_query));
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(stream),
    )
        .into_response())
}
