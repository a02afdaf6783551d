use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::confidential::{CiphertextHandle, ConfidentialU32};
use crate::error::{AdvisorError, AdvisorResult};
use crate::types::{IdSequence, ProfileId, RecommendationId, Subject, TimestampMs};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: RecommendationId,
    pub profile_id: ProfileId,
    pub encrypted_product_id: ConfidentialU32,
    pub encrypted_match_score: ConfidentialU32,
    pub generated_at: TimestampMs,
}

impl Recommendation {
    pub fn handles(&self) -> Vec<CiphertextHandle> {
        vec![
            self.encrypted_product_id.to_opaque_handle(),
            self.encrypted_match_score.to_opaque_handle(),
        ]
    }
}

/// Plaintext view of a recommendation. Zeroed until revealed; `is_revealed`
/// only ever moves from `false` to `true`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedResult {
    pub product_id: u32,
    pub match_score: u32,
    pub is_revealed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Entry {
    recommendation: Recommendation,
    revealed: RevealedResult,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecommendationBook {
    entries: BTreeMap<RecommendationId, Entry>,
    ids: IdSequence,
}

impl Default for RecommendationBook {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationBook {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            ids: IdSequence::new(),
        }
    }

    pub(crate) fn next_id(&self) -> AdvisorResult<RecommendationId> {
        self.ids
            .peek()
            .map(RecommendationId)
            .ok_or(AdvisorError::IdSpaceExhausted("recommendation"))
    }

    /// `recommendation.id` must come from [`Self::next_id`].
    pub(crate) fn insert(&mut self, recommendation: Recommendation) {
        self.ids.commit(recommendation.id.0);
        self.entries.insert(
            recommendation.id,
            Entry {
                recommendation,
                revealed: RevealedResult::default(),
            },
        );
    }

    pub fn get(&self, id: RecommendationId) -> AdvisorResult<&Recommendation> {
        self.entry(id).map(|entry| &entry.recommendation)
    }

    pub fn revealed(&self, id: RecommendationId) -> AdvisorResult<RevealedResult> {
        self.entry(id).map(|entry| entry.revealed)
    }

    pub(crate) fn ensure_unrevealed(&self, id: RecommendationId) -> AdvisorResult<()> {
        if self.entry(id)?.revealed.is_revealed {
            return Err(AdvisorError::AlreadyRevealed(id));
        }
        Ok(())
    }

    pub(crate) fn reveal(
        &mut self,
        id: RecommendationId,
        product_id: u32,
        match_score: u32,
    ) -> AdvisorResult<()> {
        self.ensure_unrevealed(id)?;
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(AdvisorError::NotFound(Subject::Recommendation(id)))?;
        entry.revealed = RevealedResult {
            product_id,
            match_score,
            is_revealed: true,
        };
        Ok(())
    }

    pub fn for_profile(&self, profile_id: ProfileId) -> impl Iterator<Item = &Recommendation> {
        self.entries
            .values()
            .map(|entry| &entry.recommendation)
            .filter(move |rec| rec.profile_id == profile_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Recommendation, &RevealedResult)> {
        self.entries
            .values()
            .map(|entry| (&entry.recommendation, &entry.revealed))
    }

    fn entry(&self, id: RecommendationId) -> AdvisorResult<&Entry> {
        self.entries
            .get(&id)
            .ok_or(AdvisorError::NotFound(Subject::Recommendation(id)))
    }
}
