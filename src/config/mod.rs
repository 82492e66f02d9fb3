use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Longest accepted magic-link lifetime (one week).
pub const MAX_TTL_MINUTES: u64 = 7 * 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub magic_link: MagicLinkConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Empty list means permissive CORS.
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct MagicLinkConfig {
    pub frontend_base: String,
    pub backend_base: String,
    pub router_prefix: String,
    pub verified_path: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub ttl_minutes: u64,
    pub single_use: bool,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub api_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub from: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
}

// Secrets stay out of Debug output so a config dump can be logged safely.
impl std::fmt::Debug for MagicLinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagicLinkConfig")
            .field("frontend_base", &self.frontend_base)
            .field("backend_base", &self.backend_base)
            .field("router_prefix", &self.router_prefix)
            .field("verified_path", &self.verified_path)
            .field("secret", &"[REDACTED]")
            .field("ttl_minutes", &self.ttl_minutes)
            .field("single_use", &self.single_use)
            .finish()
    }
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("from", &self.from)
            .finish()
    }
}

impl MagicLinkConfig {
    /// Frontend page a verified user lands on when the caller gave no `next`.
    pub fn default_destination(&self) -> String {
        let base = if self.frontend_base.ends_with('/') {
            self.frontend_base.clone()
        } else {
            format!("{}/", self.frontend_base)
        };
        format!("{}{}", base, self.verified_path)
    }

    pub fn verify_endpoint(&self) -> String {
        format!(
            "{}{}/verify-magic-link",
            self.backend_base.trim_end_matches('/'),
            self.router_prefix
        )
    }
}

impl MailConfig {
    /// Both endpoint and credentials must be present for real delivery.
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.api_url) && present(&self.api_key)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. `from_env` is this over
    /// the process environment.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let secret = lookup("MAGIC_LINK_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("MAGIC_LINK_SECRET"))?;

        // Set defaults based on environment, then override with specific env vars
        let base = match environment {
            Environment::Production => Self::production(secret),
            Environment::Staging => Self::staging(secret),
            Environment::Development => Self::development(secret),
        };

        Ok(base.with_overrides(lookup))
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(v) = lookup("COU_API_PORT").or_else(|| lookup("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.server.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Magic link overrides
        if let Some(v) = lookup("FRONTEND_BASE") {
            self.magic_link.frontend_base = v;
        }
        if let Some(v) = lookup("BASE_URL") {
            self.magic_link.backend_base = v;
        }
        if let Some(v) = lookup("ROUTER_PREFIX") {
            self.magic_link.router_prefix = normalize_prefix(&v);
        }
        if let Some(v) = lookup("MAGIC_VERIFIED_PATH") {
            self.magic_link.verified_path = v;
        }
        if let Some(v) = lookup("MAGIC_LINK_EXPIRE_MINUTES") {
            self.magic_link.ttl_minutes = match v.parse() {
                Ok(minutes @ 1..=MAX_TTL_MINUTES) => minutes,
                _ => {
                    tracing::warn!(
                        "Ignoring MAGIC_LINK_EXPIRE_MINUTES={}; expected 1..={}",
                        v,
                        MAX_TTL_MINUTES
                    );
                    self.magic_link.ttl_minutes
                }
            };
        }
        if let Some(v) = lookup("MAGIC_LINK_SINGLE_USE") {
            self.magic_link.single_use = v.parse().unwrap_or(self.magic_link.single_use);
        }

        // Mail overrides
        if let Some(v) = lookup("MAIL_API_URL") {
            self.mail.api_url = Some(v);
        }
        if let Some(v) = lookup("MAIL_API_KEY") {
            self.mail.api_key = Some(v);
        }
        if let Some(v) = lookup("MAIL_FROM") {
            self.mail.from = v;
        }

        self
    }

    fn magic_link_defaults(secret: String) -> MagicLinkConfig {
        MagicLinkConfig {
            frontend_base: "http://localhost:3000/".to_string(),
            backend_base: "http://localhost:8000".to_string(),
            router_prefix: "/api/v1/magic-auth".to_string(),
            verified_path: "auth/verified".to_string(),
            secret,
            ttl_minutes: 15,
            single_use: false,
        }
    }

    fn mail_defaults() -> MailConfig {
        MailConfig {
            api_url: None,
            api_key: None,
            from: "no-reply@example.com".to_string(),
        }
    }

    pub fn development(secret: String) -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 8000,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:3001".to_string(),
                ],
            },
            magic_link: Self::magic_link_defaults(secret),
            mail: Self::mail_defaults(),
        }
    }

    fn staging(secret: String) -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 8000,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            magic_link: Self::magic_link_defaults(secret),
            mail: Self::mail_defaults(),
        }
    }

    fn production(secret: String) -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 8000,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            magic_link: Self::magic_link_defaults(secret),
            mail: Self::mail_defaults(),
        }
    }
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_secret_is_required() {
        let err = AppConfig::from_source(source(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("MAGIC_LINK_SECRET")));

        let err = AppConfig::from_source(source(&[("MAGIC_LINK_SECRET", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::from_source(source(&[("MAGIC_LINK_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.magic_link.ttl_minutes, 15);
        assert_eq!(config.magic_link.router_prefix, "/api/v1/magic-auth");
        assert!(!config.magic_link.single_use);
        assert!(!config.mail.is_configured());
    }

    #[test]
    fn test_production_environment() {
        let config = AppConfig::from_source(source(&[
            ("MAGIC_LINK_SECRET", "s3cret"),
            ("APP_ENV", "prod"),
        ]))
        .unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.server.cors_origins, vec!["https://app.example.com".to_string()]);
        assert!(!config.magic_link.single_use);
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_source(source(&[
            ("MAGIC_LINK_SECRET", "s3cret"),
            ("PORT", "9100"),
            ("ROUTER_PREFIX", "auth/magic/"),
            ("MAGIC_LINK_EXPIRE_MINUTES", "5"),
            ("MAGIC_LINK_SINGLE_USE", "true"),
            ("SECURITY_CORS_ORIGINS", "https://a.example, https://b.example,"),
            ("MAIL_API_URL", "https://mail.example/send"),
            ("MAIL_API_KEY", "key"),
        ]))
        .unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.magic_link.router_prefix, "/auth/magic");
        assert_eq!(config.magic_link.ttl_minutes, 5);
        assert!(config.magic_link.single_use);
        assert_eq!(
            config.server.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(config.mail.is_configured());
    }

    #[test]
    fn test_invalid_overrides_keep_defaults() {
        let config = AppConfig::from_source(source(&[
            ("MAGIC_LINK_SECRET", "s3cret"),
            ("PORT", "not-a-port"),
            ("MAGIC_LINK_EXPIRE_MINUTES", "0"),
            ("MAGIC_LINK_SINGLE_USE", "maybe"),
        ]))
        .unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.magic_link.ttl_minutes, 15);
        assert!(!config.magic_link.single_use);
    }

    #[test]
    fn test_ttl_is_capped() {
        let config = AppConfig::from_source(source(&[
            ("MAGIC_LINK_SECRET", "s3cret"),
            ("MAGIC_LINK_EXPIRE_MINUTES", "1000000000000"),
        ]))
        .unwrap();
        assert_eq!(config.magic_link.ttl_minutes, 15);

        let config = AppConfig::from_source(source(&[
            ("MAGIC_LINK_SECRET", "s3cret"),
            ("MAGIC_LINK_EXPIRE_MINUTES", "18446744073709551615"),
        ]))
        .unwrap();
        assert_eq!(config.magic_link.ttl_minutes, 15);

        let config = AppConfig::from_source(source(&[
            ("MAGIC_LINK_SECRET", "s3cret"),
            ("MAGIC_LINK_EXPIRE_MINUTES", "10080"),
        ]))
        .unwrap();
        assert_eq!(config.magic_link.ttl_minutes, MAX_TTL_MINUTES);
    }

    #[test]
    fn test_default_destination_joins_with_single_slash() {
        let mut config = AppConfig::development("s3cret".to_string());
        config.magic_link.frontend_base = "https://front.example".to_string();
        assert_eq!(
            config.magic_link.default_destination(),
            "https://front.example/auth/verified"
        );

        config.magic_link.frontend_base = "https://front.example/".to_string();
        assert_eq!(
            config.magic_link.default_destination(),
            "https://front.example/auth/verified"
        );
    }

    #[test]
    fn test_verify_endpoint() {
        let mut config = AppConfig::development("s3cret".to_string());
        config.magic_link.backend_base = "https://api.example/".to_string();
        assert_eq!(
            config.magic_link.verify_endpoint(),
            "https://api.example/api/v1/magic-auth/verify-magic-link"
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = AppConfig::development("super-secret-value".to_string());
        config.mail.api_key = Some("mail-key-value".to_string());
        let dump = format!("{:?}", config);
        assert!(!dump.contains("super-secret-value"));
        assert!(!dump.contains("mail-key-value"));
    }
}
