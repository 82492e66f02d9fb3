use std::sync::Arc;

use crate::auth::MagicTokenService;
use crate::config::AppConfig;
use crate::mail::{transport_from_config, MailError, MailTransport};
use crate::services::LinkDispatcher;

/// Everything a request handler needs. Built once at startup, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: MagicTokenService,
    pub dispatcher: LinkDispatcher,
}

impl AppState {
    /// Wire the state from config, choosing the mail transport it allows.
    pub fn from_config(config: AppConfig) -> Result<Self, MailError> {
        let transport = transport_from_config(&config.mail)?;
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: AppConfig, transport: Arc<dyn MailTransport>) -> Self {
        let tokens = MagicTokenService::from_config(&config.magic_link);
        let dispatcher = LinkDispatcher::new(&config, transport);

        Self {
            config: Arc::new(config),
            tokens,
            dispatcher,
        }
    }
}
