use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

/// Signatures of tokens that have already been verified, kept only until the
/// token would have expired anyway.
#[derive(Debug, Default)]
pub struct ConsumedTokens {
    entries: Mutex<HashMap<[u8; 32], i64>>,
}

impl ConsumedTokens {
    /// Record the token as used. Returns `false` if it was already recorded.
    pub fn consume(&self, signature: &str, expires_at: i64, now: i64) -> bool {
        let key: [u8; 32] = Sha256::digest(signature.as_bytes()).into();

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, exp| *exp > now);

        if entries.contains_key(&key) {
            return false;
        }
        entries.insert(key, expires_at);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
