use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::MagicLinkConfig;

pub mod consumed;

use consumed::ConsumedTokens;

/// Claims carried inside a magic-link token. Nothing about the token is
/// stored server-side; the payload is the whole record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicClaims {
    /// Email address being authenticated
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl MagicClaims {
    /// `None` when `now + ttl` falls outside the representable time range.
    pub fn new(email: &str, now: DateTime<Utc>, ttl: Duration) -> Option<Self> {
        let expires_at = now.checked_add_signed(ttl)?;
        Some(Self {
            sub: email.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        })
    }
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("email must not be empty")]
    EmptyEmail,
    #[error("magic link signing secret is not configured")]
    MissingSecret,
    #[error("token lifetime is out of range")]
    ExpiryOutOfRange,
    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Every verification failure collapses into this one value so callers
/// cannot tell a forged token from an expired one.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid or expired magic link")]
pub struct VerifyError;

#[derive(Clone)]
struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and verifies HS256 magic-link tokens.
#[derive(Clone)]
pub struct MagicTokenService {
    keys: Option<Keys>,
    ttl: Duration,
    consumed: Option<Arc<ConsumedTokens>>,
}

impl MagicTokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let keys = (!secret.is_empty()).then(|| Keys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        });

        Self {
            keys,
            ttl,
            consumed: None,
        }
    }

    pub fn from_config(config: &MagicLinkConfig) -> Self {
        let ttl = i64::try_from(config.ttl_minutes)
            .ok()
            .and_then(Duration::try_minutes)
            .unwrap_or_else(Duration::max_value);
        let service = Self::new(&config.secret, ttl);
        if config.single_use {
            service.with_single_use()
        } else {
            service
        }
    }

    /// Reject any token that has already been verified once.
    pub fn with_single_use(mut self) -> Self {
        self.consumed = Some(Arc::new(ConsumedTokens::default()));
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, email: &str) -> Result<String, IssueError> {
        self.issue_at(email, Utc::now())
    }

    pub fn issue_at(&self, email: &str, now: DateTime<Utc>) -> Result<String, IssueError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(IssueError::EmptyEmail);
        }

        let keys = self.keys.as_ref().ok_or(IssueError::MissingSecret)?;
        let claims = MagicClaims::new(email, now, self.ttl).ok_or(IssueError::ExpiryOutOfRange)?;

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)?)
    }

    /// Returns the bound email if the signature holds and `now` is before expiry.
    pub fn verify(&self, token: &str) -> Result<String, VerifyError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, VerifyError> {
        let claims = self.decode_claims(token, now)?;

        if let Some(consumed) = &self.consumed {
            let signature = token.rsplit('.').next().unwrap_or_default();
            if !consumed.consume(signature, claims.exp, now.timestamp()) {
                tracing::debug!("Magic token rejected: already used");
                return Err(VerifyError);
            }
        }

        Ok(claims.sub)
    }

    fn decode_claims(&self, token: &str, now: DateTime<Utc>) -> Result<MagicClaims, VerifyError> {
        let Some(keys) = self.keys.as_ref() else {
            tracing::debug!("Magic token rejected: no signing secret configured");
            return Err(VerifyError);
        };

        // Expiry is checked below against the caller's clock, with no leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<MagicClaims>(token, &keys.decoding, &validation)
            .map_err(|e| {
                tracing::debug!("Magic token rejected: {}", e);
                VerifyError
            })?
            .claims;

        if now.timestamp() >= claims.exp {
            tracing::debug!("Magic token rejected: expired at {}", claims.exp);
            return Err(VerifyError);
        }
        if claims.sub.trim().is_empty() {
            tracing::debug!("Magic token rejected: empty subject");
            return Err(VerifyError);
        }

        Ok(claims)
    }
}

/// First few characters of a token, enough to correlate log lines.
pub fn token_preview(token: &str) -> String {
    let prefix: String = token.chars().take(10).collect();
    format!("{}...", prefix)
}
