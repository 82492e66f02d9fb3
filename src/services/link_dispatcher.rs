use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;
use crate::mail::{MailError, MailTransport, OutgoingEmail};

/// Query values keep `:/?&=` readable so an embedded `next` URL survives
/// as-is. Space is left alone here and turned into `+` afterwards.
const LINK_QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b' ')
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'&')
    .remove(b'=');

/// Percent-encode a single verification-link query value.
pub fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, LINK_QUERY_VALUE)
        .to_string()
        .replace(' ', "+")
}

#[derive(Debug, Error)]
#[error("Failed to send email: {0}")]
pub struct DispatchError(#[from] pub MailError);

/// Builds verification links and hands them to the mail transport.
#[derive(Clone)]
pub struct LinkDispatcher {
    verify_endpoint: String,
    default_destination: String,
    from: String,
    transport: Arc<dyn MailTransport>,
}

impl LinkDispatcher {
    pub fn new(config: &AppConfig, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            verify_endpoint: config.magic_link.verify_endpoint(),
            default_destination: config.magic_link.default_destination(),
            from: config.mail.from.clone(),
            transport,
        }
    }

    pub fn default_destination(&self) -> &str {
        &self.default_destination
    }

    /// `<backend><prefix>/verify-magic-link?token=..&redirect=true&next=..`.
    /// Falls back to the configured frontend page when `next` is absent or blank.
    pub fn verification_url(&self, token: &str, next: Option<&str>) -> String {
        let next = next
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.default_destination);

        format!(
            "{}?token={}&redirect=true&next={}",
            self.verify_endpoint,
            encode_query_value(token),
            encode_query_value(next)
        )
    }

    pub async fn dispatch(&self, email: &str, link: &str) -> Result<(), DispatchError> {
        let message = OutgoingEmail::magic_link(&self.from, email, link);
        self.transport.send(&message).await?;
        Ok(())
    }
}
