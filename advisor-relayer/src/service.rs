use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, SystemTime, SystemTimeError, UNIX_EPOCH};

use advisor_core::{
    AdvisorError, AdvisorEvent, CallbackOutcome, ClientId, CompositeEventSink,
    ConfidentialAdvisor, ConfidentialBackend, ConfidentialError, DecryptionCallback, EventSink,
    MemoryEventLog, ProfileId, RecommendationId, RequestId, RevealedResult, Subject,
    TimestampMs, TracingEventSink,
};
use advisor_oracle::{
    channel, ChannelOracle, Coprocessor, CoprocessorError, OracleNode, WorkerStats,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{Config, ConfigError, ProfileInput, RelayerSection};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Oracle(#[from] CoprocessorError),
    #[error(transparent)]
    Advisor(#[from] AdvisorError),
    #[error(transparent)]
    Confidential(#[from] ConfidentialError),
    #[error("advisor configuration rejected: {0}")]
    AdvisorConfig(#[from] advisor_core::ConfigError),
    #[error("{waiting} callbacks still outstanding after {timeout_ms}ms")]
    CallbackTimeout { waiting: usize, timeout_ms: u64 },
    #[error("oracle worker stopped before all callbacks arrived")]
    OracleStopped,
    #[error("oracle worker task failed: {0}")]
    Worker(String),
    #[error(transparent)]
    Clock(#[from] SystemTimeError),
}

/// Outcome for one configured profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProfileReport {
    pub label: String,
    pub profile_id: ProfileId,
    pub recommendation_id: Option<RecommendationId>,
    pub result: Option<RevealedResult>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RelayerReport {
    pub profiles: Vec<ProfileReport>,
    pub callbacks_applied: usize,
    pub callbacks_rejected: usize,
    pub worker: WorkerStats,
    pub events: Vec<AdvisorEvent>,
}

type RelayedAdvisor = ConfidentialAdvisor<ChannelOracle, Arc<Coprocessor>>;

/// Owns the advisor (the single writer) and drives it from oracle callbacks
/// arriving on a channel.
pub struct RelayerService {
    section: RelayerSection,
    client: ClientId,
    profiles: Vec<ProfileInput>,
    coprocessor: Arc<Coprocessor>,
    advisor: RelayedAdvisor,
    callbacks: mpsc::Receiver<DecryptionCallback>,
    worker: JoinHandle<WorkerStats>,
    log: MemoryEventLog,
    applied: usize,
    rejected: usize,
}

impl RelayerService {
    /// Spawns the oracle worker; must be called from within a tokio runtime.
    pub fn new(config: &Config) -> Result<Self, ServiceError> {
        config.validate()?;
        let advisor_config = config.effective_advisor()?;
        let node = Arc::new(OracleNode::from_config(&config.oracle)?);
        let (oracle, worker, callbacks) =
            channel(Arc::clone(&node), config.relayer.queue_capacity);

        let log = MemoryEventLog::new();
        let sinks: Vec<Arc<dyn EventSink>> =
            vec![Arc::new(log.clone()), Arc::new(TracingEventSink)];
        let advisor = ConfidentialAdvisor::new(&advisor_config, oracle, node.coprocessor())?
            .with_event_sink(Arc::new(CompositeEventSink::new(sinks)));

        Ok(Self {
            section: config.relayer.clone(),
            client: ClientId::new(config.relayer.client_id.clone()),
            profiles: config.profiles.clone(),
            coprocessor: node.coprocessor(),
            advisor,
            callbacks,
            worker: worker.spawn(),
            log,
            applied: 0,
            rejected: 0,
        })
    }

    pub async fn run(mut self) -> Result<RelayerReport, ServiceError> {
        let mut reports = Vec::with_capacity(self.profiles.len());
        for input in &self.profiles {
            let [income, assets, risk, goals] = input.values();
            let profile_id = self.advisor.submit(
                self.coprocessor.encrypt_u32(income)?,
                self.coprocessor.encrypt_u32(assets)?,
                self.coprocessor.encrypt_u32(risk)?,
                self.coprocessor.encrypt_u32(goals)?,
                now_ms()?,
            )?;
            reports.push(ProfileReport {
                label: input.label.clone(),
                profile_id,
                recommendation_id: None,
                result: None,
            });
        }

        let subjects: Vec<Subject> = reports
            .iter()
            .map(|report| Subject::Profile(report.profile_id))
            .collect();
        let generated: BTreeMap<ProfileId, RecommendationId> = self
            .cycle(subjects)
            .await?
            .into_iter()
            .filter_map(|outcome| match outcome {
                CallbackOutcome::RecommendationGenerated {
                    recommendation_id,
                    profile_id,
                } => Some((profile_id, recommendation_id)),
                CallbackOutcome::ResultRevealed { .. } => None,
            })
            .collect();
        for report in &mut reports {
            report.recommendation_id = generated.get(&report.profile_id).copied();
        }
        info!(generated = generated.len(), "recommendation cycle complete");

        if self.section.reveal {
            let subjects = generated.values().copied().map(Subject::Recommendation).collect();
            let revealed: BTreeMap<RecommendationId, RevealedResult> = self
                .cycle(subjects)
                .await?
                .into_iter()
                .filter_map(|outcome| match outcome {
                    CallbackOutcome::ResultRevealed {
                        recommendation_id,
                        result,
                    } => Some((recommendation_id, result)),
                    CallbackOutcome::RecommendationGenerated { .. } => None,
                })
                .collect();
            for report in &mut reports {
                report.result = report
                    .recommendation_id
                    .and_then(|id| revealed.get(&id).copied());
            }
            info!(revealed = revealed.len(), "reveal cycle complete");
        }

        let Self {
            advisor,
            worker,
            log,
            applied,
            rejected,
            ..
        } = self;
        // Dropping the advisor drops the job sender, which stops the worker.
        drop(advisor);
        let worker = worker
            .await
            .map_err(|err| ServiceError::Worker(err.to_string()))?;

        Ok(RelayerReport {
            profiles: reports,
            callbacks_applied: applied,
            callbacks_rejected: rejected,
            worker,
            events: log.events(),
        })
    }

    /// Requests decryption for every subject, then applies callbacks until
    /// all of them resolved.
    async fn cycle(
        &mut self,
        subjects: Vec<Subject>,
    ) -> Result<Vec<CallbackOutcome>, ServiceError> {
        let mut waiting = BTreeSet::new();
        for subject in subjects {
            let request_id = self.advisor.request_decrypt(&self.client, subject, now_ms()?)?;
            waiting.insert(request_id);
        }
        self.await_callbacks(waiting).await
    }

    async fn await_callbacks(
        &mut self,
        mut waiting: BTreeSet<RequestId>,
    ) -> Result<Vec<CallbackOutcome>, ServiceError> {
        let timeout = Duration::from_millis(self.section.callback_timeout_ms);
        let mut outcomes = Vec::with_capacity(waiting.len());
        while !waiting.is_empty() {
            let callback = match tokio::time::timeout(timeout, self.callbacks.recv()).await {
                Ok(Some(callback)) => callback,
                Ok(None) => return Err(ServiceError::OracleStopped),
                Err(_) => {
                    return Err(ServiceError::CallbackTimeout {
                        waiting: waiting.len(),
                        timeout_ms: self.section.callback_timeout_ms,
                    })
                }
            };
            match self.advisor.on_callback(&callback, now_ms()?) {
                Ok(outcome) => {
                    waiting.remove(&callback.request_id);
                    self.applied += 1;
                    outcomes.push(outcome);
                }
                Err(err) => {
                    warn!(request = %callback.request_id, error = %err, "dropping callback");
                    self.rejected += 1;
                }
            }
        }
        Ok(outcomes)
    }
}

fn now_ms() -> Result<TimestampMs, SystemTimeError> {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH)?;
    Ok(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}
