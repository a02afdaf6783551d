//! Coprocessor plus signer set: everything needed to answer a request.

use std::sync::Arc;

use advisor_core::{
    encode_words, DecryptionCallback, DecryptionRequest, OracleError, OracleTrustConfig, RequestId,
};
use hkdf::Hkdf;
use sha2::Sha256;

use crate::config::OracleConfig;
use crate::coprocessor::Coprocessor;
use crate::error::{CoprocessorError, Result};
use crate::signer::SignerSet;

pub struct OracleNode {
    node_id: String,
    coprocessor: Arc<Coprocessor>,
    signers: SignerSet,
}

impl OracleNode {
    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        config.validate()?;
        let seed = config.seed()?;
        let hkdf = Hkdf::<Sha256>::new(Some(config.node_id.as_bytes()), &seed);
        let mut handle_key = [0u8; 32];
        hkdf.expand(b"coprocessor-handle-key", &mut handle_key)
            .map_err(|_| CoprocessorError::DerivationFailed)?;

        Ok(Self {
            node_id: config.node_id.clone(),
            coprocessor: Arc::new(Coprocessor::new(handle_key)),
            signers: SignerSet::derive(
                &seed,
                &config.node_id,
                config.signer_count,
                config.threshold,
            )?,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Shared handle to the ciphertext store; hand this to the advisor as its
    /// confidential backend.
    pub fn coprocessor(&self) -> Arc<Coprocessor> {
        Arc::clone(&self.coprocessor)
    }

    pub fn signers(&self) -> &SignerSet {
        &self.signers
    }

    pub fn trust_config(&self) -> OracleTrustConfig {
        self.signers.trust_config()
    }

    /// Decrypts the requested handles and wraps the plaintext in a signed
    /// callback for `request_id`.
    pub fn fulfil(
        &self,
        request_id: RequestId,
        request: &DecryptionRequest,
    ) -> std::result::Result<DecryptionCallback, OracleError> {
        let expected = request.selector.arity();
        if request.handles.len() != expected {
            return Err(OracleError::Rejected(format!(
                "{} expects {expected} handles, got {}",
                request.selector.as_str(),
                request.handles.len()
            )));
        }
        let values = self.coprocessor.decrypt_all(&request.handles)?;
        let plaintext = encode_words(&values);
        let proof = self.signers.prove(request_id, &request.handles, &plaintext);
        Ok(DecryptionCallback {
            request_id,
            plaintext,
            proof,
        })
    }
}
