//! Link tokens, the management key check, and the rendered-report cache.

mod cache;
mod tokens;

pub use cache::{CacheKey, ReportCache};
pub use tokens::{TokenRegistry, TOKEN_LEN};

use crate::metrics::PartnerKey;
use sha2::{Digest, Sha256};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("unknown or expired report link")]
    UnknownToken,
    #[error("no metrics for partner '{0}'")]
    UnknownPartner(PartnerKey),
    #[error("invalid management key")]
    InvalidManagementKey,
    #[error("management dashboard is disabled")]
    ManagementDisabled,
}

/// Guards the management dashboard behind a shared key.
#[derive(Clone, Default)]
pub struct ManagementGate {
    digest: Option<[u8; 32]>,
}

impl std::fmt::Debug for ManagementGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagementGate")
            .field("enabled", &self.digest.is_some())
            .finish()
    }
}

impl ManagementGate {
    pub fn new(key: Option<&str>) -> Self {
        Self {
            digest: key.filter(|key| !key.is_empty()).map(digest),
        }
    }

    pub fn verify(&self, presented: &str) -> Result<(), AccessError> {
        let expected = self.digest.ok_or(AccessError::ManagementDisabled)?;
        // compare fixed-size digests so the check does not leak the key length
        if digest(presented) == expected {
            Ok(())
        } else {
            Err(AccessError::InvalidManagementKey)
        }
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_accepts_only_the_configured_key() {
        let gate = ManagementGate::new(Some("s3cret"));
        assert_eq!(gate.verify("s3cret"), Ok(()));
        assert_eq!(gate.verify("s3cre"), Err(AccessError::InvalidManagementKey));
    }

    #[test]
    fn gate_without_key_is_disabled() {
        assert_eq!(
            ManagementGate::new(None).verify("anything"),
            Err(AccessError::ManagementDisabled)
        );
        assert_eq!(
            ManagementGate::new(Some("")).verify(""),
            Err(AccessError::ManagementDisabled)
        );
    }
}
