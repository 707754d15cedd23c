//! Mail-dispatch collaborator.
//!
//! Delivery goes through an HTTP mail API with a bounded timeout; the caller
//! never blocks indefinitely on a slow relay. Delivery failures surface as a
//! distinct error so clients know to retry sending, not to retry verifying.

mod config;

use async_trait::async_trait;
use chrono::Utc;
use std::sync::LazyLock;
use thiserror::Error;

use config::{EMAIL_API_TOKEN, EMAIL_API_URL, EMAIL_TIMEOUT_SECS, SECURITY_ALERT_RECIPIENT};

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Email dispatch is not configured")]
    NotConfigured,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), EmailError>;
}

/// Posts JSON to the configured mail API endpoint.
struct HttpMailer {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpMailer {
    fn new(url: String, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(*EMAIL_TIMEOUT_SECS))
            .build()
            .expect("Failed to build mail HTTP client");

        Self { client, url, token }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        let payload = serde_json::json!({
            "to": recipient,
            "subject": subject,
            "body": body,
        });

        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmailError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            tracing::error!("Mail API returned {}: {}", status, detail);
            return Err(EmailError::Delivery(format!("Mail API returned {status}")));
        }

        tracing::debug!("Mail dispatched to {}", recipient);
        Ok(())
    }
}

/// Stands in when no mail endpoint is configured.
struct NullMailer;

#[async_trait]
impl Mailer for NullMailer {
    async fn send(&self, recipient: &str, _subject: &str, _body: &str) -> Result<(), EmailError> {
        tracing::warn!(
            "Mail to {} dropped: EMAIL_API_URL is not configured",
            recipient
        );
        Err(EmailError::NotConfigured)
    }
}

static MAILER: LazyLock<Box<dyn Mailer>> = LazyLock::new(|| match EMAIL_API_URL.as_ref() {
    Some(url) => Box::new(HttpMailer::new(url.clone(), EMAIL_API_TOKEN.clone())),
    None => Box::new(NullMailer),
});

pub(crate) async fn send_mail(
    recipient: &str,
    subject: &str,
    body: &str,
) -> Result<(), EmailError> {
    MAILER.send(recipient, subject, body).await
}

/// Best-effort security alert after a sensitive event. Never fails the
/// calling flow; a broken relay must not block an otherwise valid login.
pub(crate) async fn send_security_alert(event: &str, client: &str) {
    let Some(recipient) = SECURITY_ALERT_RECIPIENT.as_ref() else {
        return;
    };

    let subject = format!("Admin security alert: {event}");
    let body = format!(
        "Event: {event}\nClient: {client}\nTimestamp: {}\n\nIf this wasn't you, change the admin PIN immediately.",
        Utc::now().to_rfc3339()
    );

    if let Err(e) = send_mail(recipient, &subject, &body).await {
        tracing::warn!("Could not send security alert for {}: {}", event, e);
    }
}
