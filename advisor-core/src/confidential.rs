//! Opaque confidential integers.
//!
//! The advisor never sees ciphertext contents. A [`ConfidentialU32`] is only a
//! 32-byte handle naming a ciphertext held by an external coprocessor; the only
//! thing the core does with one is place it into a decryption request.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// `bytes32` handle referencing a ciphertext held outside the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CiphertextHandle(pub [u8; 32]);

impl CiphertextHandle {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

/// Encrypted `u32`. Supports no arithmetic and no direct read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfidentialU32 {
    handle: CiphertextHandle,
}

impl ConfidentialU32 {
    pub const fn from_handle(handle: CiphertextHandle) -> Self {
        Self { handle }
    }

    pub fn to_opaque_handle(&self) -> CiphertextHandle {
        self.handle
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfidentialError {
    #[error("confidential backend unavailable: {0}")]
    Unavailable(String),
    #[error("confidential backend rejected value: {0}")]
    Rejected(String),
}

/// Encryption capability the advisor uses to store computed results
/// confidentially (`from_plaintext`).
pub trait ConfidentialBackend: Send + Sync {
    fn encrypt_u32(&self, value: u32) -> Result<ConfidentialU32, ConfidentialError>;
}

impl<B: ConfidentialBackend + ?Sized> ConfidentialBackend for std::sync::Arc<B> {
    fn encrypt_u32(&self, value: u32) -> Result<ConfidentialU32, ConfidentialError> {
        (**self).encrypt_u32(value)
    }
}
