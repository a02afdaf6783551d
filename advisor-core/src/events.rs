use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::{ProfileId, RecommendationId, RequestId, Subject, TimestampMs};

/// Audit trail of state transitions. Each variant fires exactly once per
/// transition, after the transition has been fully applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AdvisorEvent {
    ProfileSubmitted {
        id: ProfileId,
        timestamp: TimestampMs,
    },
    DecryptionRequested {
        request_id: RequestId,
        subject: Subject,
    },
    RecommendationGenerated {
        recommendation_id: RecommendationId,
        profile_id: ProfileId,
    },
    ResultRevealed {
        recommendation_id: RecommendationId,
    },
    /// A stale pending request was dropped under the opt-in expiry policy.
    DecryptionExpired {
        request_id: RequestId,
        subject: Subject,
    },
}

impl AdvisorEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AdvisorEvent::ProfileSubmitted { .. } => "profile_submitted",
            AdvisorEvent::DecryptionRequested { .. } => "decryption_requested",
            AdvisorEvent::RecommendationGenerated { .. } => "recommendation_generated",
            AdvisorEvent::ResultRevealed { .. } => "result_revealed",
            AdvisorEvent::DecryptionExpired { .. } => "decryption_expired",
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &AdvisorEvent);
}

#[derive(Clone, Debug, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &AdvisorEvent) {}
}

/// Logs every event at `info`.
#[derive(Clone, Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &AdvisorEvent) {
        tracing::info!(event = event.name(), ?event, "advisor event");
    }
}

/// In-memory log; clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct MemoryEventLog {
    events: Arc<Mutex<Vec<AdvisorEvent>>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AdvisorEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn drain(&self) -> Vec<AdvisorEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.name() == name)
            .count()
    }
}

impl EventSink for MemoryEventLog {
    fn emit(&self, event: &AdvisorEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Fan-out sink for emitting to multiple consumers.
pub struct CompositeEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl CompositeEventSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for CompositeEventSink {
    fn emit(&self, event: &AdvisorEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
