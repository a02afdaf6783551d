//! Confidential advisor core: an encrypt, request-decryption, compute and
//! reveal state machine for financial profiles and the recommendations
//! derived from them.
//!
//! Profiles arrive as opaque ciphertext handles. Plaintext only ever enters
//! the core through an oracle callback whose threshold signature proof binds
//! it to the exact handles that were sent out, and every callback is applied
//! atomically by [`ConfidentialAdvisor`]. Scoring, encryption and the oracle
//! transport are trait seams so hosts can plug in their own coprocessor.

pub mod access;
pub mod advisor;
pub mod confidential;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod oracle;
pub mod payload;
pub mod proof;
pub mod recommendation;
pub mod registry;
pub mod router;
pub mod types;

#[cfg(test)]
mod testkit;

pub use access::AccessPolicy;
pub use advisor::{AdvisorSnapshot, CallbackOutcome, ConfidentialAdvisor, RecommendationRecord};
pub use confidential::{CiphertextHandle, ConfidentialBackend, ConfidentialError, ConfidentialU32};
pub use config::{AccessConfig, AdvisorConfig, ConfigError, OracleTrustConfig, RequestConfig};
pub use engine::{compute, FinancialAttributes, RecommendationEngine, Scored, ScoringPolicy};
pub use error::{AdvisorError, AdvisorResult};
pub use events::{
    AdvisorEvent, CompositeEventSink, EventSink, MemoryEventLog, NoopEventSink, TracingEventSink,
};
pub use oracle::{DecryptionCallback, DecryptionOracle, DecryptionRequest, OracleError};
pub use payload::{decode_array, decode_words, encode_words, PayloadError};
pub use proof::{decryption_digest, DecryptionProof, OracleSignature, OracleVerifier, ProofError};
pub use recommendation::{Recommendation, RecommendationBook, RevealedResult};
pub use registry::{EncryptedProfile, Profile, ProfileRegistry};
pub use router::{Admission, DecryptionRequestRouter, PendingRequest, RequestState};
pub use types::{
    ClientId, DecryptionKind, ProfileId, RecommendationId, RequestId, Subject, TimestampMs,
};
