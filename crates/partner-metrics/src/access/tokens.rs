use crate::metrics::PartnerKey;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

pub const TOKEN_LEN: usize = 16;

/// Opaque per-partner link tokens, held in memory for the life of the process.
///
/// With a secret, a partner's token is derived from the secret and the key, so separate processes
/// (the notifier and the server) agree on links. Without one, tokens are random and process-local.
#[derive(Default)]
pub struct TokenRegistry {
    secret: Option<String>,
    tokens: RwLock<HashMap<String, PartnerKey>>,
}

impl fmt::Debug for TokenRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRegistry")
            .field("keyed", &self.secret.is_some())
            .field("tokens", &self.len())
            .finish()
    }
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|secret| !secret.is_empty()),
            tokens: RwLock::default(),
        }
    }

    pub fn is_keyed(&self) -> bool {
        self.secret.is_some()
    }

    /// Registers a token for `key`. Random tokens are fresh on every call and earlier ones stay valid.
    pub fn issue(&self, key: &PartnerKey) -> String {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(secret) = &self.secret {
            let token = derive(secret, key);
            tokens.insert(token.clone(), key.clone());
            return token;
        }
        loop {
            let token = mint(key);
            if !tokens.contains_key(&token) {
                tokens.insert(token.clone(), key.clone());
                return token;
            }
        }
    }

    /// Registers derived tokens for every key; a no-op for unkeyed registries.
    pub fn register_all<'a>(&self, keys: impl IntoIterator<Item = &'a PartnerKey>) {
        if self.secret.is_some() {
            for key in keys {
                self.issue(key);
            }
        }
    }

    /// Returns an existing token for `key`, minting one when none exists.
    pub fn token_for(&self, key: &PartnerKey) -> String {
        let existing = self
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, owner)| *owner == key)
            .map(|(token, _)| token.clone())
            .min();
        existing.unwrap_or_else(|| self.issue(key))
    }

    /// Whether `token` has the shape of an issued token: [`TOKEN_LEN`] lowercase hex digits.
    pub fn is_well_formed(token: &str) -> bool {
        token.len() == TOKEN_LEN
            && token
                .bytes()
                .all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte))
    }

    pub fn resolve(&self, token: &str) -> Option<PartnerKey> {
        if !Self::is_well_formed(token) {
            return None;
        }
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn derive(secret: &str, key: &PartnerKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update([0u8]);
    hasher.update(key.as_str().as_bytes());
    truncate(hasher.finalize().as_slice())
}

fn truncate(digest: &[u8]) -> String {
    let mut token = hex::encode(digest);
    token.truncate(TOKEN_LEN);
    token
}

fn mint(key: &PartnerKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_str().as_bytes());
    hasher.update(Utc::now().timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    truncate(hasher.finalize().as_slice())
}
