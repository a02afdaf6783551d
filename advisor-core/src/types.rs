use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds since the Unix epoch, supplied by the caller of every mutating call.
pub type TimestampMs = u64;

/// Identifier assigned by the profile registry. `0` is reserved as "no value".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProfileId(pub u64);

/// Identifier assigned to every generated recommendation. `0` is reserved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecommendationId(pub u64);

/// Oracle-issued identifier echoed back verbatim in the matching callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "profile-{}", self.0)
    }
}

impl fmt::Display for RecommendationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "recommendation-{}", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request-{}", self.0)
    }
}

/// Which decryption cycle a request belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecryptionKind {
    ProfileDecrypt,
    RecommendationDecrypt,
}

impl DecryptionKind {
    /// Number of `u32` values the oracle must return for this kind.
    pub const fn arity(&self) -> usize {
        match self {
            DecryptionKind::ProfileDecrypt => 4,
            DecryptionKind::RecommendationDecrypt => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DecryptionKind::ProfileDecrypt => "profile-decrypt",
            DecryptionKind::RecommendationDecrypt => "recommendation-decrypt",
        }
    }
}

/// The entity a decryption request pertains to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "kebab-case")]
pub enum Subject {
    Profile(ProfileId),
    Recommendation(RecommendationId),
}

impl Subject {
    pub fn kind(&self) -> DecryptionKind {
        match self {
            Subject::Profile(_) => DecryptionKind::ProfileDecrypt,
            Subject::Recommendation(_) => DecryptionKind::RecommendationDecrypt,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Profile(id) => id.fmt(f),
            Subject::Recommendation(id) => id.fmt(f),
        }
    }
}

/// Identity of the client invoking a gated operation.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monotonic sequence used for profile and recommendation ids.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct IdSequence {
    last: u64,
}

impl IdSequence {
    pub(crate) const fn new() -> Self {
        Self { last: 0 }
    }

    /// Next id without consuming it.
    pub(crate) fn peek(&self) -> Option<u64> {
        self.last.checked_add(1)
    }

    pub(crate) fn commit(&mut self, id: u64) {
        debug_assert!(id > self.last);
        self.last = id;
    }
}
