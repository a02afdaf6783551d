use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoprocessorError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoprocessorError {
    #[error("secret seed must be 64 hex characters, got {0} bytes")]
    InvalidSeedLength(usize),
    #[error("secret seed is not valid hex: {0}")]
    InvalidSeedHex(String),
    #[error("signer threshold invalid: threshold={threshold} signers={signers}")]
    InvalidThreshold { threshold: usize, signers: usize },
    #[error("hkdf expand failed")]
    DerivationFailed,
}
