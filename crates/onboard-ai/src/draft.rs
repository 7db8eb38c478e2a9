//! Welcome-message drafting from a statement of work.

use serde::{Deserialize, Serialize};

use crate::client::AiClient;
use crate::error::AiError;
use crate::Result;

/// The structured reply the provider is asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeDraft {
    pub welcome_message: String,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

pub fn draft_prompt(client_name: &str, sow_text: &str) -> String {
    format!(
        "Write a welcome message for our new client {client_name} and list the first \
         onboarding steps, based on their statement of work below.\n\
         Reply with JSON only, shaped as \
         {{\"welcomeMessage\": string, \"nextSteps\": [string]}}.\n\n\
         Statement of work:\n{sow_text}"
    )
}

pub fn reformat_prompt(bad_output: &str) -> String {
    format!(
        "Rewrite the following as JSON only, shaped as \
         {{\"welcomeMessage\": string, \"nextSteps\": [string]}}. \
         No commentary, no code fences.\n\n{bad_output}"
    )
}

/// Drop a surrounding ``` fence (with or without a language tag).
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a provider reply, tolerating code fences and prose around the
/// JSON object.
pub fn parse_draft(raw: &str) -> Result<WelcomeDraft> {
    let text = strip_code_fence(raw);
    let object = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => {
            return Err(AiError::Malformed(
                "no JSON object in provider reply".into(),
            ))
        }
    };
    let mut draft: WelcomeDraft = serde_json::from_str(object)
        .map_err(|e| AiError::Malformed(format!("welcome draft: {e}")))?;
    draft.next_steps.retain(|s| !s.trim().is_empty());
    if draft.welcome_message.trim().is_empty() {
        return Err(AiError::Malformed("empty welcome message".into()));
    }
    Ok(draft)
}

/// Ask for a draft; on an unparseable reply, ask once more to reformat it.
pub async fn draft_welcome(
    client: &AiClient,
    client_name: &str,
    sow_text: &str,
) -> Result<WelcomeDraft> {
    let first = client.complete(&draft_prompt(client_name, sow_text)).await?;
    match parse_draft(&first) {
        Ok(draft) => Ok(draft),
        Err(e) => {
            tracing::warn!(error = %e, "welcome draft unparseable; requesting reformat");
            let second = client.complete(&reformat_prompt(&first)).await?;
            parse_draft(&second)
        }
    }
}
