use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::config::MailConfig;

pub mod http;

pub use http::HttpMailTransport;

/// Outgoing message in the shape accepted by Resend-style HTTP mail APIs.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl OutgoingEmail {
    pub fn magic_link(from: &str, to: &str, link: &str) -> Self {
        Self {
            from: from.to_string(),
            to: vec![to.to_string()],
            subject: "Your CloudOU sign-in link".to_string(),
            text: Some(format!(
                "Click to sign in:\n\n{link}\n\nIf you didn't request this, you can ignore this email."
            )),
            html: Some(format!(
                "<p>Click to sign in:</p>\n<p><a href=\"{link}\">{link}</a></p>\n<p>If you didn't request this, you can ignore this email.</p>"
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("build client failed: {0}")]
    Client(String),
    #[error("send failed: {0}")]
    Send(#[from] reqwest::Error),
    #[error("mail API error: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// Development fallback used when no mail credentials are configured.
/// Writes the message to the log instead of delivering it.
#[derive(Debug, Default, Clone)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        tracing::warn!(
            to = %email.to.join(","),
            subject = %email.subject,
            "[DEV] mail transport not configured, message not sent:\n{}",
            email.text.as_deref().unwrap_or_default()
        );
        Ok(())
    }
}

/// Pick the transport the config allows: real delivery when both endpoint and
/// key are set, otherwise the logging fallback.
pub fn transport_from_config(config: &MailConfig) -> Result<Arc<dyn MailTransport>, MailError> {
    match (config.is_configured(), &config.api_url, &config.api_key) {
        (true, Some(url), Some(key)) => Ok(Arc::new(HttpMailTransport::new(url, key)?)),
        _ => {
            tracing::warn!("MAIL_API_URL / MAIL_API_KEY not set; magic links will be logged, not sent");
            Ok(Arc::new(LogTransport))
        }
    }
}
