//! Outgoing mail: POSTed to a delivery webhook, or only logged when none
//! is configured.

use onboard_core::config::MailConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid recipient '{0}'")]
    InvalidRecipient(String),

    #[error("mail webhook error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail webhook returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    Sent,
    Logged,
}

#[derive(Debug, Clone)]
pub struct Mailer {
    http: reqwest::Client,
    webhook_url: Option<String>,
    from: String,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl Mailer {
    pub fn from_config(config: &MailConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url: config.webhook_url.clone().filter(|u| !u.trim().is_empty()),
            from: config.from.clone(),
        }
    }

    pub async fn send(&self, mail: &OutgoingMail) -> Result<Delivery, MailError> {
        let to = mail.to.trim();
        if onboard_core::paths::validate_email(to).is_err() {
            return Err(MailError::InvalidRecipient(mail.to.clone()));
        }

        let Some(url) = &self.webhook_url else {
            tracing::info!(to, subject = %mail.subject, "mail webhook not configured; logging message");
            return Ok(Delivery::Logged);
        };

        let resp = self
            .http
            .post(url)
            .json(&WebhookPayload {
                from: &self.from,
                to,
                subject: &mail.subject,
                html: &mail.html,
            })
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), to, "mail webhook rejected message");
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        tracing::info!(to, subject = %mail.subject, "sent mail");
        Ok(Delivery::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: &str) -> OutgoingMail {
        OutgoingMail {
            to: to.into(),
            subject: "Welcome".into(),
            html: "<p>Hi</p>".into(),
        }
    }

    #[tokio::test]
    async fn without_webhook_mail_is_logged() {
        let m = Mailer::from_config(&MailConfig::default());
        assert_eq!(m.send(&mail("ops@acme.example")).await.unwrap(), Delivery::Logged);
    }

    #[tokio::test]
    async fn bad_recipient_is_rejected_before_delivery() {
        let m = Mailer::from_config(&MailConfig::default());
        assert!(matches!(
            m.send(&mail("nobody")).await,
            Err(MailError::InvalidRecipient(_))
        ));
    }

    #[tokio::test]
    async fn webhook_receives_payload() {
        let mut server = mockito::Server::new_async().await;
        let hook = server
            .mock("POST", "/mail")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "to": "ops@acme.example",
                "subject": "Welcome"
            })))
            .with_status(202)
            .create_async()
            .await;
        let m = Mailer::from_config(&MailConfig {
            webhook_url: Some(format!("{}/mail", server.url())),
            ..Default::default()
        });
        assert_eq!(m.send(&mail("ops@acme.example")).await.unwrap(), Delivery::Sent);
        hook.assert_async().await;
    }

    #[tokio::test]
    async fn webhook_failure_surfaces() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(500)
            .with_body("down")
            .create_async()
            .await;
        let m = Mailer::from_config(&MailConfig {
            webhook_url: Some(server.url()),
            ..Default::default()
        });
        assert!(matches!(
            m.send(&mail("ops@acme.example")).await,
            Err(MailError::Rejected { status: 500, .. })
        ));
    }
}
