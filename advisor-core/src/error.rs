use thiserror::Error;

use crate::confidential::ConfidentialError;
use crate::oracle::OracleError;
use crate::payload::PayloadError;
use crate::proof::ProofError;
use crate::types::{ClientId, RecommendationId, RequestId, Subject};

pub type AdvisorResult<T> = Result<T, AdvisorError>;

/// Every variant is scoped to the single call that produced it; a failed
/// call never leaves partial state behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdvisorError {
    #[error("{0} not found")]
    NotFound(Subject),
    #[error("no pending decryption for {0}")]
    UnknownRequest(RequestId),
    #[error("invalid decryption proof: {0}")]
    InvalidProof(#[from] ProofError),
    #[error("malformed plaintext payload: {0}")]
    MalformedPayload(#[from] PayloadError),
    #[error("{0} has already been revealed")]
    AlreadyRevealed(RecommendationId),
    #[error("{subject} already has pending {request_id}")]
    RequestAlreadyPending {
        subject: Subject,
        request_id: RequestId,
    },
    #[error("client {client} may not request decryption")]
    Unauthorized { client: ClientId },
    #[error("pending request limit of {limit} reached")]
    TooManyPendingRequests { limit: usize },
    #[error("oracle reissued live {0}")]
    DuplicateRequestId(RequestId),
    #[error("{0} identifier space exhausted")]
    IdSpaceExhausted(&'static str),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Confidential(#[from] ConfidentialError),
}
