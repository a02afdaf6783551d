use std::convert::TryInto;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::AccessPolicy;
use crate::proof::OracleVerifier;

const fn default_threshold() -> usize {
    1
}

const fn default_max_pending() -> usize {
    4_096
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("oracle signer #{index} is not a valid Ed25519 key: {reason}")]
    InvalidSignerKey { index: usize, reason: String },
    #[error("configuration invalid: {0}")]
    Validation(String),
}

/// Advisor configuration section.
///
/// # TOML
/// ```text
/// [advisor.oracle]
/// signers = ["3b6a27bc...", "8a88e3dd..."]
/// threshold = 2
///
/// [advisor.access]
/// allowed-clients = ["advisor-ui"]
///
/// [advisor.requests]
/// pending-ttl-ms = 600000
/// max-pending = 4096
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct AdvisorConfig {
    #[serde(default)]
    pub oracle: OracleTrustConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub requests: RequestConfig,
}

/// Key material the callback proofs are checked against.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct OracleTrustConfig {
    /// Hex-encoded Ed25519 verifying keys.
    #[serde(default)]
    pub signers: Vec<String>,
    /// Distinct signers required per proof.
    #[serde(default = "default_threshold")]
    pub threshold: usize,
}

impl Default for OracleTrustConfig {
    fn default() -> Self {
        Self {
            signers: Vec::new(),
            threshold: default_threshold(),
        }
    }
}

impl OracleTrustConfig {
    pub fn from_keys(keys: &[VerifyingKey], threshold: usize) -> Self {
        Self {
            signers: keys.iter().map(|key| hex::encode(key.to_bytes())).collect(),
            threshold,
        }
    }

    pub fn verifier(&self) -> Result<OracleVerifier, ConfigError> {
        if self.signers.is_empty() {
            return Err(ConfigError::Validation(
                "at least one oracle signer must be trusted".into(),
            ));
        }
        if self.threshold == 0 || self.threshold > self.signers.len() {
            return Err(ConfigError::Validation(format!(
                "oracle threshold {} must be within 1..={}",
                self.threshold,
                self.signers.len()
            )));
        }
        let keys = self
            .signers
            .iter()
            .enumerate()
            .map(|(index, encoded)| decode_key(index, encoded))
            .collect::<Result<Vec<_>, _>>()?;
        let verifier = OracleVerifier::from_keys(keys, self.threshold);
        if verifier.signer_count() != self.signers.len() {
            return Err(ConfigError::Validation(
                "oracle signers must be distinct".into(),
            ));
        }
        Ok(verifier)
    }
}

fn decode_key(index: usize, encoded: &str) -> Result<VerifyingKey, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidSignerKey { index, reason };
    let bytes = hex::decode(encoded.trim_start_matches("0x")).map_err(|e| invalid(e.to_string()))?;
    let raw: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| invalid(format!("expected 32 bytes, got {}", bytes.len())))?;
    VerifyingKey::from_bytes(&raw).map_err(|e| invalid(e.to_string()))
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct AccessConfig {
    /// Empty means every client may request decryption.
    #[serde(default)]
    pub allowed_clients: Vec<String>,
}

impl AccessConfig {
    pub fn policy(&self) -> AccessPolicy {
        self.allowed_clients.iter().cloned().collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RequestConfig {
    /// Age after which a pending request may be superseded. `None` keeps
    /// requests alive until answered.
    #[serde(default)]
    pub pending_ttl_ms: Option<u64>,
    /// Upper bound on live pending requests.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            pending_ttl_ms: None,
            max_pending: default_max_pending(),
        }
    }
}

impl AdvisorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.oracle.verifier()?;
        if self.requests.max_pending == 0 {
            return Err(ConfigError::Validation(
                "max pending requests must be greater than zero".into(),
            ));
        }
        if self.requests.pending_ttl_ms == Some(0) {
            return Err(ConfigError::Validation(
                "pending ttl must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }

    /// Permissive, non-expiring configuration trusting `keys`.
    pub fn sample(keys: &[VerifyingKey], threshold: usize) -> Self {
        Self {
            oracle: OracleTrustConfig::from_keys(keys, threshold),
            access: AccessConfig::default(),
            requests: RequestConfig::default(),
        }
    }
}
