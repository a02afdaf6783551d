//! Ciphertext store standing in for an FHE coprocessor.
//!
//! Handles are keyed BLAKE3 digests over a monotonically increasing counter
//! and the value, so equal plaintexts never share a handle and handles leak
//! nothing about the value without the key.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use advisor_core::{
    CiphertextHandle, ConfidentialBackend, ConfidentialError, ConfidentialU32, OracleError,
};
use blake3::Hasher;
use parking_lot::RwLock;

pub struct Coprocessor {
    handle_key: [u8; 32],
    counter: AtomicU64,
    store: RwLock<HashMap<CiphertextHandle, u32>>,
}

impl Coprocessor {
    pub fn new(handle_key: [u8; 32]) -> Self {
        Self {
            handle_key,
            counter: AtomicU64::new(0),
            store: RwLock::new(HashMap::new()),
        }
    }

    pub fn decrypt(&self, handle: &CiphertextHandle) -> Result<u32, OracleError> {
        self.store
            .read()
            .get(handle)
            .copied()
            .ok_or_else(|| OracleError::UnknownHandle(handle.to_string()))
    }

    /// Decrypts `handles` in order; fails on the first unknown handle.
    pub fn decrypt_all(&self, handles: &[CiphertextHandle]) -> Result<Vec<u32>, OracleError> {
        let store = self.store.read();
        handles
            .iter()
            .map(|handle| {
                store
                    .get(handle)
                    .copied()
                    .ok_or_else(|| OracleError::UnknownHandle(handle.to_string()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    fn derive_handle(&self, nonce: u64, value: u32) -> CiphertextHandle {
        let mut hasher = Hasher::new_keyed(&self.handle_key);
        hasher.update(&nonce.to_be_bytes());
        hasher.update(&value.to_be_bytes());
        CiphertextHandle(*hasher.finalize().as_bytes())
    }
}

impl ConfidentialBackend for Coprocessor {
    fn encrypt_u32(&self, value: u32) -> Result<ConfidentialU32, ConfidentialError> {
        let nonce = self.counter.fetch_add(1, Ordering::Relaxed);
        if nonce == u64::MAX {
            return Err(ConfidentialError::Unavailable(
                "ciphertext counter exhausted".into(),
            ));
        }
        let handle = self.derive_handle(nonce, value);
        self.store.write().insert(handle, value);
        Ok(ConfidentialU32::from_handle(handle))
    }
}
