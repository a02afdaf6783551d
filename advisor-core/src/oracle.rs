//! Boundary with the external decryption oracle.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::confidential::CiphertextHandle;
use crate::proof::DecryptionProof;
use crate::types::{DecryptionKind, RequestId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    #[error("oracle has no ciphertext for handle {0}")]
    UnknownHandle(String),
    #[error("oracle request rejected: {0}")]
    Rejected(String),
}

/// Outbound request: ordered handles plus the selector the callback is routed to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionRequest {
    pub handles: Vec<CiphertextHandle>,
    pub selector: DecryptionKind,
}

/// Inbound callback as delivered by the oracle. Nothing in it is trusted until
/// the proof has been checked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionCallback {
    pub request_id: RequestId,
    pub plaintext: Vec<u8>,
    pub proof: DecryptionProof,
}

/// Capability to issue decryption requests. Implementations must hand out
/// globally unique request ids and echo them verbatim in the callback.
pub trait DecryptionOracle: Send {
    fn request_decryption(&mut self, request: DecryptionRequest)
        -> Result<RequestId, OracleError>;
}

impl<O: DecryptionOracle + ?Sized> DecryptionOracle for Box<O> {
    fn request_decryption(
        &mut self,
        request: DecryptionRequest,
    ) -> Result<RequestId, OracleError> {
        (**self).request_decryption(request)
    }
}
