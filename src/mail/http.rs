use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::{Duration, Instant};

use super::{MailError, MailTransport, OutgoingEmail};

/// Delivers mail by POSTing JSON to an HTTP mail API with bearer credentials.
pub struct HttpMailTransport {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpMailTransport {
    pub fn new(api_url: &str, api_key: &str) -> Result<Self, MailError> {
        let client = ClientBuilder::new()
            .user_agent(concat!("cou-magic-auth/", env!("CARGO_PKG_VERSION")))
            .tcp_nodelay(true)
            .pool_idle_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MailError::Client(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        tracing::debug!(url = %self.api_url, to = %email.to.join(","), "mail -> POST");

        let t0 = Instant::now();
        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        tracing::debug!(%status, elapsed_ms = t0.elapsed().as_millis() as u64, "mail <- response");

        if status.is_success() {
            Ok(())
        } else {
            Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
