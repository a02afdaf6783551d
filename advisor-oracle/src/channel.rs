//! Asynchronous oracle transport over tokio channels.
//!
//! [`ChannelOracle`] is the advisor-facing half: it assigns request ids and
//! forwards jobs without blocking. [`OracleWorker`] runs on the runtime,
//! fulfils each job against an [`OracleNode`] and pushes the signed callback
//! back to whoever drives the advisor.

use std::sync::Arc;

use advisor_core::{
    DecryptionCallback, DecryptionOracle, DecryptionRequest, OracleError, RequestId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::node::OracleNode;

#[derive(Clone, Debug)]
pub struct OracleJob {
    pub request_id: RequestId,
    pub request: DecryptionRequest,
}

pub struct ChannelOracle {
    last_id: u64,
    jobs: mpsc::Sender<OracleJob>,
}

impl DecryptionOracle for ChannelOracle {
    fn request_decryption(
        &mut self,
        request: DecryptionRequest,
    ) -> Result<RequestId, OracleError> {
        let reserved = self.jobs.try_reserve().map_err(|err| match err {
            mpsc::error::TrySendError::Full(()) => {
                OracleError::Unavailable("oracle job queue is full".into())
            }
            mpsc::error::TrySendError::Closed(()) => {
                OracleError::Unavailable("oracle worker has stopped".into())
            }
        })?;
        let next = self
            .last_id
            .checked_add(1)
            .ok_or_else(|| OracleError::Rejected("request id space exhausted".into()))?;
        self.last_id = next;
        let request_id = RequestId(next);
        reserved.send(OracleJob {
            request_id,
            request,
        });
        Ok(request_id)
    }
}

/// Totals reported when the worker stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    pub fulfilled: u64,
    pub failed: u64,
}

pub struct OracleWorker {
    node: Arc<OracleNode>,
    jobs: mpsc::Receiver<OracleJob>,
    callbacks: mpsc::Sender<DecryptionCallback>,
}

impl OracleWorker {
    /// Runs until every [`ChannelOracle`] is dropped or the callback receiver
    /// goes away.
    pub async fn run(mut self) -> WorkerStats {
        let mut stats = WorkerStats::default();
        info!(node = self.node.node_id(), "oracle worker started");
        while let Some(job) = self.jobs.recv().await {
            match self.node.fulfil(job.request_id, &job.request) {
                Ok(callback) => {
                    debug!(request = %job.request_id, "decryption fulfilled");
                    if self.callbacks.send(callback).await.is_err() {
                        warn!("callback receiver dropped; stopping oracle worker");
                        break;
                    }
                    stats.fulfilled += 1;
                }
                Err(err) => {
                    warn!(request = %job.request_id, error = %err, "decryption job failed");
                    stats.failed += 1;
                }
            }
        }
        info!(
            fulfilled = stats.fulfilled,
            failed = stats.failed,
            "oracle worker stopped"
        );
        stats
    }

    pub fn spawn(self) -> JoinHandle<WorkerStats> {
        tokio::spawn(self.run())
    }
}

/// Builds a connected oracle/worker pair. `capacity` bounds both the job and
/// the callback queues.
pub fn channel(
    node: Arc<OracleNode>,
    capacity: usize,
) -> (ChannelOracle, OracleWorker, mpsc::Receiver<DecryptionCallback>) {
    let (job_tx, job_rx) = mpsc::channel(capacity.max(1));
    let (callback_tx, callback_rx) = mpsc::channel(capacity.max(1));
    let oracle = ChannelOracle {
        last_id: 0,
        jobs: job_tx,
    };
    let worker = OracleWorker {
        node,
        jobs: job_rx,
        callbacks: callback_tx,
    };
    (oracle, worker, callback_rx)
}
