//! Confidential profile storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::confidential::{CiphertextHandle, ConfidentialU32};
use crate::error::{AdvisorError, AdvisorResult};
use crate::types::{IdSequence, ProfileId, Subject, TimestampMs};

/// Immutable once stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub encrypted_income: ConfidentialU32,
    pub encrypted_assets: ConfidentialU32,
    pub encrypted_risk_tolerance: ConfidentialU32,
    pub encrypted_goals: ConfidentialU32,
    pub created_at: TimestampMs,
}

impl Profile {
    /// Handles in the order the oracle must return plaintext.
    pub fn handles(&self) -> Vec<CiphertextHandle> {
        vec![
            self.encrypted_income.to_opaque_handle(),
            self.encrypted_assets.to_opaque_handle(),
            self.encrypted_risk_tolerance.to_opaque_handle(),
            self.encrypted_goals.to_opaque_handle(),
        ]
    }
}

/// Convenience bundle for the four encrypted attributes of a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedProfile {
    pub income: ConfidentialU32,
    pub assets: ConfidentialU32,
    pub risk_tolerance: ConfidentialU32,
    pub goals: ConfidentialU32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileRegistry {
    profiles: BTreeMap<ProfileId, Profile>,
    ids: IdSequence,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self {
            profiles: BTreeMap::new(),
            ids: IdSequence::new(),
        }
    }

    /// Stores the ciphertext handles as-is; contents are never inspected.
    pub fn submit(
        &mut self,
        encrypted: EncryptedProfile,
        now_ms: TimestampMs,
    ) -> AdvisorResult<ProfileId> {
        let raw = self
            .ids
            .peek()
            .ok_or(AdvisorError::IdSpaceExhausted("profile"))?;
        let id = ProfileId(raw);
        self.ids.commit(raw);
        self.profiles.insert(
            id,
            Profile {
                id,
                encrypted_income: encrypted.income,
                encrypted_assets: encrypted.assets,
                encrypted_risk_tolerance: encrypted.risk_tolerance,
                encrypted_goals: encrypted.goals,
                created_at: now_ms,
            },
        );
        Ok(id)
    }

    pub fn get(&self, id: ProfileId) -> AdvisorResult<&Profile> {
        self.profiles
            .get(&id)
            .ok_or(AdvisorError::NotFound(Subject::Profile(id)))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }
}
