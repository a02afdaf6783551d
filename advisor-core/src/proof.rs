//! Oracle attestation checks.
//!
//! A decryption proof is a set of Ed25519 signatures over
//! [`decryption_digest`]. The digest binds the plaintext to the request id and
//! to the exact ciphertext handles that were submitted, so a proof for one
//! request can never be replayed against another.

use std::collections::{BTreeMap, BTreeSet};
use std::convert::TryInto;

use ed25519_dalek::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::confidential::CiphertextHandle;
use crate::types::RequestId;

const DIGEST_DOMAIN: &[u8] = b"confidential-advisor/decryption/v1";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("proof carries no signatures")]
    MissingSignatures,
    #[error("signer {signer} is not a trusted oracle key")]
    UntrustedSigner { signer: String },
    #[error("signer {signer} appears more than once")]
    DuplicateSigner { signer: String },
    #[error("signature from {signer} is not 64 bytes")]
    MalformedSignature { signer: String },
    #[error("signature from {signer} does not match the decryption digest")]
    BadSignature { signer: String },
    #[error("only {valid} valid signatures, {required} required")]
    BelowThreshold { valid: usize, required: usize },
}

/// One oracle signer's attestation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSignature {
    /// Raw Ed25519 verifying key of the signer.
    pub signer: [u8; 32],
    pub signature: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionProof {
    pub signatures: Vec<OracleSignature>,
}

pub fn decryption_digest(
    request_id: RequestId,
    handles: &[CiphertextHandle],
    plaintext: &[u8],
) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DIGEST_DOMAIN);
    hasher.update(&request_id.0.to_be_bytes());
    hasher.update(&(handles.len() as u64).to_be_bytes());
    for handle in handles {
        hasher.update(handle.as_bytes());
    }
    hasher.update(&(plaintext.len() as u64).to_be_bytes());
    hasher.update(plaintext);
    let mut out = [0u8; 32];
    out.copy_from_slice(hasher.finalize().as_bytes());
    out
}

/// Known oracle key material plus the number of distinct signers required.
#[derive(Clone, Debug)]
pub struct OracleVerifier {
    signers: BTreeMap<[u8; 32], VerifyingKey>,
    threshold: usize,
}

impl OracleVerifier {
    /// Callers validate `threshold` against the key count (see
    /// [`crate::config::OracleTrustConfig::verifier`]).
    pub(crate) fn from_keys(keys: Vec<VerifyingKey>, threshold: usize) -> Self {
        let signers = keys.into_iter().map(|key| (key.to_bytes(), key)).collect();
        Self { signers, threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn signer_count(&self) -> usize {
        self.signers.len()
    }

    pub fn verify(
        &self,
        request_id: RequestId,
        handles: &[CiphertextHandle],
        plaintext: &[u8],
        proof: &DecryptionProof,
    ) -> Result<(), ProofError> {
        if proof.signatures.is_empty() {
            return Err(ProofError::MissingSignatures);
        }
        let digest = decryption_digest(request_id, handles, plaintext);
        let mut seen = BTreeSet::new();
        for entry in &proof.signatures {
            let signer = || hex::encode(entry.signer);
            let key = self
                .signers
                .get(&entry.signer)
                .ok_or_else(|| ProofError::UntrustedSigner { signer: signer() })?;
            if !seen.insert(entry.signer) {
                return Err(ProofError::DuplicateSigner { signer: signer() });
            }
            let bytes: [u8; 64] = entry
                .signature
                .as_slice()
                .try_into()
                .map_err(|_| ProofError::MalformedSignature { signer: signer() })?;
            let signature = Signature::from_bytes(&bytes);
            key.verify_strict(&digest, &signature)
                .map_err(|_| ProofError::BadSignature { signer: signer() })?;
        }
        if seen.len() < self.threshold {
            return Err(ProofError::BelowThreshold {
                valid: seen.len(),
                required: self.threshold,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signer, SigningKey};

    use super::*;

    fn keys(n: u8) -> Vec<SigningKey> {
        (1..=n).map(|i| SigningKey::from_bytes(&[i; 32])).collect()
    }

    fn sign(key: &SigningKey, digest: &[u8; 32]) -> OracleSignature {
        OracleSignature {
            signer: key.verifying_key().to_bytes(),
            signature: key.sign(digest).to_bytes().to_vec(),
        }
    }

    fn setup(threshold: usize) -> (Vec<SigningKey>, OracleVerifier) {
        let signing = keys(3);
        let verifier = OracleVerifier::from_keys(
            signing.iter().map(SigningKey::verifying_key).collect(),
            threshold,
        );
        (signing, verifier)
    }

    #[test]
    fn accepts_threshold_signatures() {
        let (signing, verifier) = setup(2);
        let handles = [CiphertextHandle([1; 32])];
        let digest = decryption_digest(RequestId(7), &handles, b"plain");
        let proof = DecryptionProof {
            signatures: vec![sign(&signing[0], &digest), sign(&signing[2], &digest)],
        };
        verifier
            .verify(RequestId(7), &handles, b"plain", &proof)
            .unwrap();
    }

    #[test]
    fn rejects_proof_bound_to_other_request() {
        let (signing, verifier) = setup(1);
        let handles = [CiphertextHandle([1; 32])];
        let digest = decryption_digest(RequestId(7), &handles, b"plain");
        let proof = DecryptionProof {
            signatures: vec![sign(&signing[0], &digest)],
        };
        let err = verifier
            .verify(RequestId(8), &handles, b"plain", &proof)
            .unwrap_err();
        assert!(matches!(err, ProofError::BadSignature { .. }));
        let err = verifier
            .verify(RequestId(7), &handles, b"forged", &proof)
            .unwrap_err();
        assert!(matches!(err, ProofError::BadSignature { .. }));
    }

    #[test]
    fn rejects_untrusted_duplicate_and_short_proofs() {
        let (signing, verifier) = setup(2);
        let handles = [CiphertextHandle([2; 32])];
        let digest = decryption_digest(RequestId(1), &handles, b"x");

        let empty = DecryptionProof::default();
        assert_eq!(
            verifier.verify(RequestId(1), &handles, b"x", &empty),
            Err(ProofError::MissingSignatures)
        );

        let outsider = SigningKey::from_bytes(&[99; 32]);
        let untrusted = DecryptionProof {
            signatures: vec![sign(&outsider, &digest)],
        };
        assert!(matches!(
            verifier.verify(RequestId(1), &handles, b"x", &untrusted),
            Err(ProofError::UntrustedSigner { .. })
        ));

        let duplicated = DecryptionProof {
            signatures: vec![sign(&signing[0], &digest), sign(&signing[0], &digest)],
        };
        assert!(matches!(
            verifier.verify(RequestId(1), &handles, b"x", &duplicated),
            Err(ProofError::DuplicateSigner { .. })
        ));

        let single = DecryptionProof {
            signatures: vec![sign(&signing[1], &digest)],
        };
        assert_eq!(
            verifier.verify(RequestId(1), &handles, b"x", &single),
            Err(ProofError::BelowThreshold {
                valid: 1,
                required: 2
            })
        );

        let mut truncated = sign(&signing[1], &digest);
        truncated.signature.truncate(10);
        let malformed = DecryptionProof {
            signatures: vec![truncated],
        };
        assert!(matches!(
            verifier.verify(RequestId(1), &handles, b"x", &malformed),
            Err(ProofError::MalformedSignature { .. })
        ));
    }
}
