use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{CoprocessorError, Result};

fn default_secret_seed() -> String {
    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);
    hex::encode(seed)
}

const fn default_signer_count() -> usize {
    3
}

const fn default_threshold() -> usize {
    2
}

/// Oracle node configuration section.
///
/// # TOML
/// ```text
/// [oracle]
/// node-id = "coprocessor-a"
/// secret-seed = "2222..."
/// signer-count = 3
/// threshold = 2
/// ```
///
/// # YAML
/// ```text
/// oracle:
///   node-id: coprocessor-a
///   secret-seed: "2222..."
///   signer-count: 3
///   threshold: 2
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct OracleConfig {
    /// Identifier mixed into every key derivation.
    pub node_id: String,
    /// Hex-encoded 32-byte seed. Generated automatically if omitted, in which
    /// case ciphertext handles and signer keys change on every start.
    #[serde(default = "default_secret_seed")]
    pub secret_seed: String,
    #[serde(default = "default_signer_count")]
    pub signer_count: usize,
    /// Signatures attached to each callback.
    #[serde(default = "default_threshold")]
    pub threshold: usize,
}

impl OracleConfig {
    /// Canonical sample helpful for docs/tests.
    pub fn sample(node_id: &str) -> Self {
        Self {
            node_id: node_id.to_owned(),
            secret_seed: "2222222222222222222222222222222222222222222222222222222222222222".into(),
            signer_count: default_signer_count(),
            threshold: default_threshold(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 || self.threshold > self.signer_count {
            return Err(CoprocessorError::InvalidThreshold {
                threshold: self.threshold,
                signers: self.signer_count,
            });
        }
        decode_seed(&self.secret_seed).map(|_| ())
    }

    pub(crate) fn seed(&self) -> Result<[u8; 32]> {
        decode_seed(&self.secret_seed)
    }
}

fn decode_seed(seed_hex: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(seed_hex)
        .map_err(|_| CoprocessorError::InvalidSeedHex(seed_hex.to_owned()))?;
    if bytes.len() != 32 {
        return Err(CoprocessorError::InvalidSeedLength(bytes.len()));
    }
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&bytes);
    Ok(seed)
}
