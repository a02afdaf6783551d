use std::collections::VecDeque;
use std::sync::Arc;

use advisor_core::{
    DecryptionCallback, DecryptionOracle, DecryptionRequest, OracleError, RequestId,
};

use crate::node::OracleNode;

/// Synchronous oracle: requests queue up until the host asks for them to be
/// fulfilled, which makes delivery order fully controllable.
pub struct LocalOracle {
    node: Arc<OracleNode>,
    last_id: u64,
    queue: VecDeque<(RequestId, DecryptionRequest)>,
}

impl LocalOracle {
    pub fn new(node: Arc<OracleNode>) -> Self {
        Self {
            node,
            last_id: 0,
            queue: VecDeque::new(),
        }
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn queued_ids(&self) -> Vec<RequestId> {
        self.queue.iter().map(|(id, _)| *id).collect()
    }

    /// Fulfils the oldest queued request.
    pub fn deliver_next(&mut self) -> Option<Result<DecryptionCallback, OracleError>> {
        let (request_id, request) = self.queue.pop_front()?;
        Some(self.node.fulfil(request_id, &request))
    }

    /// Fulfils a specific queued request, out of order if need be.
    pub fn fulfil(
        &mut self,
        request_id: RequestId,
    ) -> Option<Result<DecryptionCallback, OracleError>> {
        let position = self.queue.iter().position(|(id, _)| *id == request_id)?;
        let (request_id, request) = self.queue.remove(position)?;
        Some(self.node.fulfil(request_id, &request))
    }

    /// Drops a queued request without answering it.
    pub fn discard(&mut self, request_id: RequestId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|(id, _)| *id != request_id);
        self.queue.len() != before
    }
}

impl DecryptionOracle for LocalOracle {
    fn request_decryption(
        &mut self,
        request: DecryptionRequest,
    ) -> Result<RequestId, OracleError> {
        let next = self
            .last_id
            .checked_add(1)
            .ok_or_else(|| OracleError::Rejected("request id space exhausted".into()))?;
        self.last_id = next;
        let request_id = RequestId(next);
        self.queue.push_back((request_id, request));
        Ok(request_id)
    }
}
