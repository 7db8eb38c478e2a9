use serde::{Deserialize, Serialize};

use crate::error::AiError;
use crate::stream::InsightStream;
use crate::Result;

/// Where and how to reach the provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    text: String,
}

/// Thin HTTP client for the generative-text provider.
///
/// Wire contract: `POST <endpoint>` with `{"model", "prompt", "stream"}`.
/// Non-streaming replies are `{"text": "..."}`; streaming replies are a raw
/// text body.
#[derive(Debug, Clone)]
pub struct AiClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl AiClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Build a client from optional settings; `None` endpoint means the
    /// provider is not configured.
    pub fn from_settings(
        endpoint: Option<&str>,
        model: &str,
        api_key: Option<String>,
    ) -> Result<Self> {
        let endpoint = endpoint
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(AiError::NotConfigured)?;
        Ok(Self::new(ProviderConfig {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key,
        }))
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn request(&self, prompt: &str, stream: bool) -> reqwest::RequestBuilder {
        let body = CompletionRequest {
            model: &self.config.model,
            prompt,
            stream,
        };
        let req = self.http.post(&self.config.endpoint).json(&body);
        match &self.config.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    pub(crate) async fn send(&self, prompt: &str, stream: bool) -> Result<reqwest::Response> {
        tracing::debug!(model = %self.config.model, stream, "provider request");
        let resp = self.request(prompt, stream).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "provider returned an error");
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    /// One-shot completion.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let resp = self.send(prompt, false).await?;
        let body = resp.text().await?;
        let parsed: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| AiError::Malformed(format!("expected {{\"text\": ...}}: {e}")))?;
        Ok(parsed.text)
    }

    /// Start a streamed completion. The request runs on a background task;
    /// see [`InsightStream`] for cancellation.
    pub fn stream(&self, prompt: String) -> InsightStream {
        let client = self.clone();
        InsightStream::spawn(async move {
            let resp = client.send(&prompt, true).await?;
            Ok(resp.bytes_stream())
        })
    }
}
