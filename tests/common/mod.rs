#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use anyhow::{Context, Result};
use async_trait::async_trait;
use cou_magic_auth::config::AppConfig;
use cou_magic_auth::mail::{MailError, MailTransport, OutgoingEmail};
use cou_magic_auth::state::AppState;

pub const TEST_SECRET: &str = "integration-test-signing-secret";

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(
                std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
            ))
            .with_test_writer()
            .try_init();
    });
}

/// Captures outgoing mail instead of delivering it.
#[derive(Default)]
pub struct Outbox {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl Outbox {
    pub fn messages(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// The verification link from the most recent message.
    pub fn last_link(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let text = sent.last()?.text.clone()?;
        text.split_whitespace()
            .find(|word| word.starts_with("http"))
            .map(str::to_string)
    }
}

#[async_trait]
impl MailTransport for Outbox {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Shared buffer for a scoped `tracing` subscriber, so tests can assert on
/// what was logged.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub state: AppState,
}

impl TestServer {
    pub fn prefix_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.state.config.magic_link.router_prefix, path)
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development(TEST_SECRET.to_string());
    config.magic_link.frontend_base = "https://frontend.example".to_string();
    config
}

/// Boot the router on a free port inside the current test runtime.
pub async fn spawn_server(
    mut config: AppConfig,
    transport: Arc<dyn MailTransport>,
) -> Result<TestServer> {
    init_tracing();

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);
    config.magic_link.backend_base = base_url.clone();

    let state = AppState::with_transport(config, transport);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test listener")?;

    let app = cou_magic_auth::app(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestServer {
        port,
        base_url,
        state,
    })
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("failed to build test client")
}
