//! The single-writer core tying registry, router and engine together.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{AdvisorConfig, ConfigError};
use crate::confidential::{ConfidentialBackend, ConfidentialU32};
use crate::engine::{FinancialAttributes, RecommendationEngine, ScoringPolicy};
use crate::error::{AdvisorError, AdvisorResult};
use crate::events::{AdvisorEvent, EventSink, NoopEventSink};
use crate::oracle::{DecryptionCallback, DecryptionOracle};
use crate::payload::decode_array;
use crate::recommendation::{Recommendation, RecommendationBook, RevealedResult};
use crate::registry::{EncryptedProfile, Profile, ProfileRegistry};
use crate::router::{DecryptionRequestRouter, PendingRequest, RequestState};
use crate::types::{
    ClientId, ProfileId, RecommendationId, RequestId, Subject, TimestampMs,
};

/// What an accepted callback did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallbackOutcome {
    RecommendationGenerated {
        recommendation_id: RecommendationId,
        profile_id: ProfileId,
    },
    ResultRevealed {
        recommendation_id: RecommendationId,
        result: RevealedResult,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub recommendation: Recommendation,
    pub revealed: RevealedResult,
}

/// Serializable view of all stored state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorSnapshot {
    pub profiles: Vec<Profile>,
    pub recommendations: Vec<RecommendationRecord>,
    pub pending: Vec<PendingRequest>,
}

/// Every mutating method takes `&mut self`; callers that share an advisor
/// across tasks serialize access themselves.
pub struct ConfidentialAdvisor<O, B> {
    registry: ProfileRegistry,
    book: RecommendationBook,
    router: DecryptionRequestRouter<O>,
    backend: B,
    scoring: Box<dyn ScoringPolicy>,
    events: Arc<dyn EventSink>,
}

impl<O: DecryptionOracle, B: ConfidentialBackend> ConfidentialAdvisor<O, B> {
    pub fn new(config: &AdvisorConfig, oracle: O, backend: B) -> Result<Self, ConfigError> {
        config.validate()?;
        let router = DecryptionRequestRouter::new(
            oracle,
            config.oracle.verifier()?,
            config.access.policy(),
            config.requests.clone(),
        );
        Ok(Self {
            registry: ProfileRegistry::new(),
            book: RecommendationBook::new(),
            router,
            backend,
            scoring: Box::new(RecommendationEngine),
            events: Arc::new(NoopEventSink),
        })
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    pub fn with_scoring_policy(mut self, policy: Box<dyn ScoringPolicy>) -> Self {
        self.scoring = policy;
        self
    }

    pub fn submit(
        &mut self,
        encrypted_income: ConfidentialU32,
        encrypted_assets: ConfidentialU32,
        encrypted_risk_tolerance: ConfidentialU32,
        encrypted_goals: ConfidentialU32,
        now_ms: TimestampMs,
    ) -> AdvisorResult<ProfileId> {
        self.submit_profile(
            EncryptedProfile {
                income: encrypted_income,
                assets: encrypted_assets,
                risk_tolerance: encrypted_risk_tolerance,
                goals: encrypted_goals,
            },
            now_ms,
        )
    }

    pub fn submit_profile(
        &mut self,
        encrypted: EncryptedProfile,
        now_ms: TimestampMs,
    ) -> AdvisorResult<ProfileId> {
        let id = self.registry.submit(encrypted, now_ms)?;
        debug!(profile = %id, "profile submitted");
        self.events.emit(&AdvisorEvent::ProfileSubmitted {
            id,
            timestamp: now_ms,
        });
        Ok(id)
    }

    /// Starts a decryption cycle for `subject`. A recommendation that has
    /// already been revealed cannot be requested again.
    pub fn request_decrypt(
        &mut self,
        client: &ClientId,
        subject: Subject,
        now_ms: TimestampMs,
    ) -> AdvisorResult<RequestId> {
        self.router.authorize(client)?;
        let handles = match subject {
            Subject::Profile(id) => self.registry.get(id)?.handles(),
            Subject::Recommendation(id) => {
                self.book.ensure_unrevealed(id)?;
                self.book.get(id)?.handles()
            }
        };
        let admission = self.router.admit(client, subject, handles, now_ms)?;
        if let Some(stale) = &admission.superseded {
            self.events.emit(&AdvisorEvent::DecryptionExpired {
                request_id: stale.request_id,
                subject: stale.subject,
            });
        }
        self.events.emit(&AdvisorEvent::DecryptionRequested {
            request_id: admission.request_id,
            subject,
        });
        Ok(admission.request_id)
    }

    /// Ingests an oracle callback. Rejected callbacks leave all state untouched.
    pub fn on_callback(
        &mut self,
        callback: &DecryptionCallback,
        now_ms: TimestampMs,
    ) -> AdvisorResult<CallbackOutcome> {
        match self.apply_callback(callback, now_ms) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(request = %callback.request_id, error = %err, "callback rejected");
                Err(err)
            }
        }
    }

    fn apply_callback(
        &mut self,
        callback: &DecryptionCallback,
        now_ms: TimestampMs,
    ) -> AdvisorResult<CallbackOutcome> {
        let subject = self.router.authenticate(callback)?.subject;
        let request_id = callback.request_id;

        let outcome = match subject {
            Subject::Profile(profile_id) => {
                let attributes = FinancialAttributes::from(decode_array::<4>(&callback.plaintext)?);
                self.registry.get(profile_id)?;
                let scored = self.scoring.score(&attributes);
                let encrypted_product_id = self.backend.encrypt_u32(scored.product_id)?;
                let encrypted_match_score = self.backend.encrypt_u32(scored.match_score)?;
                let recommendation_id = self.book.next_id()?;

                self.book.insert(Recommendation {
                    id: recommendation_id,
                    profile_id,
                    encrypted_product_id,
                    encrypted_match_score,
                    generated_at: now_ms,
                });
                self.router.resolve(request_id);
                self.events.emit(&AdvisorEvent::RecommendationGenerated {
                    recommendation_id,
                    profile_id,
                });
                CallbackOutcome::RecommendationGenerated {
                    recommendation_id,
                    profile_id,
                }
            }
            Subject::Recommendation(recommendation_id) => {
                let [product_id, match_score] = decode_array::<2>(&callback.plaintext)?;
                self.book.reveal(recommendation_id, product_id, match_score)?;
                self.router.resolve(request_id);
                self.events.emit(&AdvisorEvent::ResultRevealed { recommendation_id });
                CallbackOutcome::ResultRevealed {
                    recommendation_id,
                    result: self.book.revealed(recommendation_id)?,
                }
            }
        };
        debug!(request = %request_id, %subject, "callback applied");
        Ok(outcome)
    }

    /// Drops pending requests older than the configured ttl and returns them.
    pub fn expire_pending(&mut self, now_ms: TimestampMs) -> Vec<PendingRequest> {
        let expired = self.router.expire(now_ms);
        for stale in &expired {
            self.events.emit(&AdvisorEvent::DecryptionExpired {
                request_id: stale.request_id,
                subject: stale.subject,
            });
        }
        expired
    }

    pub fn profile(&self, id: ProfileId) -> AdvisorResult<&Profile> {
        self.registry.get(id)
    }

    pub fn recommendation(&self, id: RecommendationId) -> AdvisorResult<&Recommendation> {
        self.book.get(id)
    }

    pub fn revealed_result(&self, id: RecommendationId) -> AdvisorResult<RevealedResult> {
        self.book.revealed(id)
    }

    pub fn recommendations_for_profile(&self, profile_id: ProfileId) -> Vec<&Recommendation> {
        self.book.for_profile(profile_id).collect()
    }

    pub fn pending(&self, request_id: RequestId) -> Option<&PendingRequest> {
        self.router.pending(request_id)
    }

    pub fn pending_requests(&self) -> Vec<&PendingRequest> {
        self.router.pending_requests().collect()
    }

    pub fn request_state(&self, subject: Subject) -> RequestState {
        self.router.state(subject)
    }

    pub fn profile_count(&self) -> usize {
        self.registry.len()
    }

    pub fn recommendation_count(&self) -> usize {
        self.book.len()
    }

    pub fn router(&self) -> &DecryptionRequestRouter<O> {
        &self.router
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        self.router.oracle_mut()
    }

    pub fn snapshot(&self) -> AdvisorSnapshot {
        AdvisorSnapshot {
            profiles: self.registry.iter().cloned().collect(),
            recommendations: self
                .book
                .iter()
                .map(|(recommendation, revealed)| RecommendationRecord {
                    recommendation: recommendation.clone(),
                    revealed: *revealed,
                })
                .collect(),
            pending: self.router.pending_requests().cloned().collect(),
        }
    }
}
