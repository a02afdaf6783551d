//! In-crate fakes for the oracle and confidential backend.

use std::collections::HashMap;
use std::sync::Arc;

use ed25519_dalek::{Signer, SigningKey};
use parking_lot::Mutex;

use crate::advisor::ConfidentialAdvisor;
use crate::confidential::{
    CiphertextHandle, ConfidentialBackend, ConfidentialError, ConfidentialU32,
};
use crate::config::AdvisorConfig;
use crate::events::MemoryEventLog;
use crate::oracle::{DecryptionCallback, DecryptionOracle, DecryptionRequest, OracleError};
use crate::payload::encode_words;
use crate::proof::{decryption_digest, DecryptionProof, OracleSignature};
use crate::types::RequestId;

pub(crate) const NOW: u64 = 1_700_000_000_000;

#[derive(Default)]
pub(crate) struct TestBackend {
    store: Mutex<HashMap<CiphertextHandle, u32>>,
    pub(crate) refuse: Mutex<bool>,
}

impl TestBackend {
    pub(crate) fn decrypt(&self, handle: &CiphertextHandle) -> u32 {
        self.store.lock()[handle]
    }
}

impl ConfidentialBackend for TestBackend {
    fn encrypt_u32(&self, value: u32) -> Result<ConfidentialU32, ConfidentialError> {
        if *self.refuse.lock() {
            return Err(ConfidentialError::Unavailable("refusing".into()));
        }
        let mut store = self.store.lock();
        let handle = CiphertextHandle(
            *blake3::hash(&(store.len() as u64).to_le_bytes()).as_bytes(),
        );
        store.insert(handle, value);
        Ok(ConfidentialU32::from_handle(handle))
    }
}

pub(crate) fn signing_keys() -> Vec<SigningKey> {
    (1..=3u8).map(|i| SigningKey::from_bytes(&[i; 32])).collect()
}

pub(crate) fn config() -> AdvisorConfig {
    let keys: Vec<_> = signing_keys().iter().map(SigningKey::verifying_key).collect();
    AdvisorConfig::sample(&keys, 2)
}

pub(crate) struct TestOracle {
    backend: Arc<TestBackend>,
    next_id: u64,
    pub(crate) issued: Vec<(RequestId, DecryptionRequest)>,
    pub(crate) offline: bool,
    pub(crate) reuse_ids: bool,
}

impl TestOracle {
    pub(crate) fn new(backend: Arc<TestBackend>) -> Self {
        Self {
            backend,
            next_id: 100,
            issued: Vec::new(),
            offline: false,
            reuse_ids: false,
        }
    }

    /// Honest callback for a previously issued request.
    pub(crate) fn callback(&self, request_id: RequestId) -> DecryptionCallback {
        let (_, request) = self
            .issued
            .iter()
            .rev()
            .find(|(id, _)| *id == request_id)
            .expect("request was issued");
        let values: Vec<u32> = request
            .handles
            .iter()
            .map(|h| self.backend.decrypt(h))
            .collect();
        signed_callback(request_id, &request.handles, encode_words(&values))
    }
}

pub(crate) fn signed_callback(
    request_id: RequestId,
    handles: &[CiphertextHandle],
    plaintext: Vec<u8>,
) -> DecryptionCallback {
    let digest = decryption_digest(request_id, handles, &plaintext);
    let signatures = signing_keys()
        .iter()
        .take(2)
        .map(|key| OracleSignature {
            signer: key.verifying_key().to_bytes(),
            signature: key.sign(&digest).to_bytes().to_vec(),
        })
        .collect();
    DecryptionCallback {
        request_id,
        plaintext,
        proof: DecryptionProof { signatures },
    }
}

impl DecryptionOracle for TestOracle {
    fn request_decryption(
        &mut self,
        request: DecryptionRequest,
    ) -> Result<RequestId, OracleError> {
        if self.offline {
            return Err(OracleError::Unavailable("offline".into()));
        }
        if !self.reuse_ids {
            self.next_id += 1;
        }
        let id = RequestId(self.next_id);
        self.issued.push((id, request));
        Ok(id)
    }
}

pub(crate) type TestAdvisor = ConfidentialAdvisor<TestOracle, Arc<TestBackend>>;

pub(crate) fn advisor_with(
    config: &AdvisorConfig,
) -> (TestAdvisor, Arc<TestBackend>, MemoryEventLog) {
    let backend = Arc::new(TestBackend::default());
    let log = MemoryEventLog::new();
    let oracle = TestOracle::new(backend.clone());
    let advisor = ConfidentialAdvisor::new(config, oracle, backend.clone())
        .expect("valid config")
        .with_event_sink(Arc::new(log.clone()));
    (advisor, backend, log)
}

pub(crate) fn advisor() -> (TestAdvisor, Arc<TestBackend>, MemoryEventLog) {
    advisor_with(&config())
}
