//! Decryption request routing.
//!
//! The router owns the only contended resource in the system: the mapping
//! from oracle request id to the subject it was issued for. Admission of a new
//! request (precondition checks plus insertion) and resolution of a callback
//! each happen under a single `&mut self` borrow, so check-then-act races
//! cannot occur.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::access::AccessPolicy;
use crate::config::RequestConfig;
use crate::confidential::CiphertextHandle;
use crate::error::{AdvisorError, AdvisorResult};
use crate::oracle::{DecryptionCallback, DecryptionOracle, DecryptionRequest};
use crate::proof::OracleVerifier;
use crate::types::{ClientId, DecryptionKind, RequestId, Subject, TimestampMs};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub request_id: RequestId,
    pub subject: Subject,
    /// Handles exactly as sent to the oracle; the proof must cover them.
    pub handles: Vec<CiphertextHandle>,
    pub requested_by: ClientId,
    pub requested_at: TimestampMs,
}

impl PendingRequest {
    pub fn kind(&self) -> DecryptionKind {
        self.subject.kind()
    }
}

/// Per-subject lifecycle: `NoRequest → Requested → Resolved`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "request_id", rename_all = "kebab-case")]
pub enum RequestState {
    NoRequest,
    Requested(RequestId),
    Resolved(RequestId),
}

/// Outcome of a successful admission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Admission {
    pub request_id: RequestId,
    /// Stale request dropped under the expiry policy, if any.
    pub superseded: Option<PendingRequest>,
}

pub struct DecryptionRequestRouter<O> {
    oracle: O,
    verifier: OracleVerifier,
    access: AccessPolicy,
    limits: RequestConfig,
    by_request: BTreeMap<RequestId, PendingRequest>,
    by_subject: BTreeMap<Subject, RequestId>,
    last_resolved: BTreeMap<Subject, RequestId>,
}

impl<O: DecryptionOracle> DecryptionRequestRouter<O> {
    pub fn new(
        oracle: O,
        verifier: OracleVerifier,
        access: AccessPolicy,
        limits: RequestConfig,
    ) -> Self {
        Self {
            oracle,
            verifier,
            access,
            limits,
            by_request: BTreeMap::new(),
            by_subject: BTreeMap::new(),
            last_resolved: BTreeMap::new(),
        }
    }

    pub fn authorize(&self, client: &ClientId) -> AdvisorResult<()> {
        if !self.access.permits(client) {
            return Err(AdvisorError::Unauthorized {
                client: client.clone(),
            });
        }
        Ok(())
    }

    /// Issues an oracle request for `subject` and records it as pending.
    ///
    /// The subject's existence and reveal state are checked by the caller;
    /// this covers the per-subject exclusivity, capacity and oracle-id
    /// uniqueness checks. Nothing is recorded unless every check passes.
    pub fn admit(
        &mut self,
        client: &ClientId,
        subject: Subject,
        handles: Vec<CiphertextHandle>,
        now_ms: TimestampMs,
    ) -> AdvisorResult<Admission> {
        let stale = match self.by_subject.get(&subject) {
            Some(live) => {
                if !self.is_expired(*live, now_ms) {
                    return Err(AdvisorError::RequestAlreadyPending {
                        subject,
                        request_id: *live,
                    });
                }
                Some(*live)
            }
            None => None,
        };

        let occupied = self.by_request.len() - usize::from(stale.is_some());
        if occupied >= self.limits.max_pending {
            return Err(AdvisorError::TooManyPendingRequests {
                limit: self.limits.max_pending,
            });
        }

        let request_id = self.oracle.request_decryption(DecryptionRequest {
            handles: handles.clone(),
            selector: subject.kind(),
        })?;
        if self.by_request.contains_key(&request_id) {
            return Err(AdvisorError::DuplicateRequestId(request_id));
        }

        let superseded = stale.and_then(|id| self.remove(id));
        self.by_subject.insert(subject, request_id);
        self.by_request.insert(
            request_id,
            PendingRequest {
                request_id,
                subject,
                handles,
                requested_by: client.clone(),
                requested_at: now_ms,
            },
        );
        debug!(%request_id, %subject, "decryption request admitted");
        Ok(Admission {
            request_id,
            superseded,
        })
    }

    /// Steps 1 and 2 of callback ingestion: the request must be live and the
    /// proof must verify against the trusted oracle keys.
    pub fn authenticate(&self, callback: &DecryptionCallback) -> AdvisorResult<&PendingRequest> {
        let pending = self
            .by_request
            .get(&callback.request_id)
            .ok_or(AdvisorError::UnknownRequest(callback.request_id))?;
        self.verifier.verify(
            callback.request_id,
            &pending.handles,
            &callback.plaintext,
            &callback.proof,
        )?;
        Ok(pending)
    }

    /// Consumes a pending request after its effects were applied.
    pub(crate) fn resolve(&mut self, request_id: RequestId) -> Option<PendingRequest> {
        let pending = self.remove(request_id)?;
        self.last_resolved.insert(pending.subject, request_id);
        Some(pending)
    }

    /// Drops every pending request older than the configured ttl. A no-op
    /// when no ttl is configured.
    pub(crate) fn expire(&mut self, now_ms: TimestampMs) -> Vec<PendingRequest> {
        let stale: Vec<RequestId> = self
            .by_request
            .keys()
            .copied()
            .filter(|id| self.is_expired(*id, now_ms))
            .collect();
        stale.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    pub fn pending(&self, request_id: RequestId) -> Option<&PendingRequest> {
        self.by_request.get(&request_id)
    }

    pub fn pending_requests(&self) -> impl Iterator<Item = &PendingRequest> {
        self.by_request.values()
    }

    pub fn state(&self, subject: Subject) -> RequestState {
        if let Some(live) = self.by_subject.get(&subject) {
            return RequestState::Requested(*live);
        }
        match self.last_resolved.get(&subject) {
            Some(done) => RequestState::Resolved(*done),
            None => RequestState::NoRequest,
        }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    fn is_expired(&self, request_id: RequestId, now_ms: TimestampMs) -> bool {
        match (self.limits.pending_ttl_ms, self.by_request.get(&request_id)) {
            (Some(ttl), Some(pending)) => now_ms.saturating_sub(pending.requested_at) >= ttl,
            _ => false,
        }
    }

    fn remove(&mut self, request_id: RequestId) -> Option<PendingRequest> {
        let pending = self.by_request.remove(&request_id)?;
        self.by_subject.remove(&pending.subject);
        Some(pending)
    }
}
