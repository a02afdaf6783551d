//! Seed-derived Ed25519 signer set producing threshold decryption proofs.

use advisor_core::{
    decryption_digest, CiphertextHandle, DecryptionProof, OracleSignature, OracleTrustConfig,
    RequestId,
};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::{CoprocessorError, Result};

pub struct SignerSet {
    keys: Vec<SigningKey>,
    threshold: usize,
}

impl SignerSet {
    /// Derives `count` signing keys from `seed`, salted by `node_id`.
    pub fn derive(seed: &[u8; 32], node_id: &str, count: usize, threshold: usize) -> Result<Self> {
        if threshold == 0 || threshold > count {
            return Err(CoprocessorError::InvalidThreshold {
                threshold,
                signers: count,
            });
        }
        let hkdf = Hkdf::<Sha256>::new(Some(node_id.as_bytes()), seed);
        let keys = (0..count)
            .map(|index| {
                let mut material = [0u8; 32];
                hkdf.expand(format!("oracle-signer-{index}").as_bytes(), &mut material)
                    .map_err(|_| CoprocessorError::DerivationFailed)?;
                Ok(SigningKey::from_bytes(&material))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { keys, threshold })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn verifying_keys(&self) -> Vec<VerifyingKey> {
        self.keys.iter().map(SigningKey::verifying_key).collect()
    }

    /// Trust section an advisor needs to accept this set's proofs.
    pub fn trust_config(&self) -> OracleTrustConfig {
        OracleTrustConfig::from_keys(&self.verifying_keys(), self.threshold)
    }

    /// Signs with exactly `threshold` keys.
    pub fn prove(
        &self,
        request_id: RequestId,
        handles: &[CiphertextHandle],
        plaintext: &[u8],
    ) -> DecryptionProof {
        let digest = decryption_digest(request_id, handles, plaintext);
        let signatures = self
            .keys
            .iter()
            .take(self.threshold)
            .map(|key| OracleSignature {
                signer: key.verifying_key().to_bytes(),
                signature: key.sign(&digest).to_bytes().to_vec(),
            })
            .collect();
        DecryptionProof { signatures }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic_per_node() {
        let a = SignerSet::derive(&[9; 32], "node-a", 3, 2).unwrap();
        let again = SignerSet::derive(&[9; 32], "node-a", 3, 2).unwrap();
        let other = SignerSet::derive(&[9; 32], "node-b", 3, 2).unwrap();
        assert_eq!(a.verifying_keys(), again.verifying_keys());
        assert_ne!(a.verifying_keys(), other.verifying_keys());
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn proofs_verify_against_trust_config() {
        let set = SignerSet::derive(&[3; 32], "node-a", 3, 2).unwrap();
        let verifier = set.trust_config().verifier().unwrap();
        let handles = [CiphertextHandle([1; 32])];
        let proof = set.prove(RequestId(4), &handles, b"payload");
        assert_eq!(proof.signatures.len(), 2);
        verifier
            .verify(RequestId(4), &handles, b"payload", &proof)
            .unwrap();
        assert!(verifier
            .verify(RequestId(5), &handles, b"payload", &proof)
            .is_err());
    }

    #[test]
    fn rejects_impossible_thresholds() {
        assert!(matches!(
            SignerSet::derive(&[0; 32], "n", 2, 3),
            Err(CoprocessorError::InvalidThreshold { .. })
        ));
    }
}
