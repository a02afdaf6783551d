//! Demo scoring policy.
//!
//! This is a replaceable policy that runs on plaintext the oracle already
//! revealed; it is not a security boundary. Alternative policies plug in
//! through [`ScoringPolicy`].

use serde::{Deserialize, Serialize};

pub const PRODUCT_BASELINE: u32 = 1;
pub const PRODUCT_INCOME_GOAL: u32 = 2;
pub const PRODUCT_HIGH_RISK: u32 = 3;

pub const MAX_MATCH_SCORE: u32 = 100;

/// Revealed profile attributes, in submission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialAttributes {
    pub income: u32,
    pub assets: u32,
    pub risk_score: u32,
    pub goals: u32,
}

impl From<[u32; 4]> for FinancialAttributes {
    fn from([income, assets, risk_score, goals]: [u32; 4]) -> Self {
        Self {
            income,
            assets,
            risk_score,
            goals,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scored {
    pub product_id: u32,
    pub match_score: u32,
}

pub trait ScoringPolicy: Send + Sync {
    fn score(&self, attributes: &FinancialAttributes) -> Scored;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RecommendationEngine;

impl ScoringPolicy for RecommendationEngine {
    fn score(&self, attributes: &FinancialAttributes) -> Scored {
        let (product_id, match_score) = compute(
            attributes.income,
            attributes.assets,
            attributes.risk_score,
            attributes.goals,
        );
        Scored {
            product_id,
            match_score,
        }
    }
}

/// Returns `(product_id, match_score)`. Total over all inputs.
pub fn compute(income: u32, assets: u32, risk_score: u32, goals: u32) -> (u32, u32) {
    let product_id = if risk_score > 70 && assets > 500_000 {
        PRODUCT_HIGH_RISK
    } else if income > 100_000 && goals == 2 {
        PRODUCT_INCOME_GOAL
    } else {
        PRODUCT_BASELINE
    };

    // u64 so `risk_score + goals * 10` cannot wrap before the clamp.
    let raw = u64::from(income / 10_000)
        + u64::from(assets / 100_000)
        + u64::from(risk_score)
        + u64::from(goals) * 10;
    let match_score = raw.min(u64::from(MAX_MATCH_SCORE)) as u32;

    (product_id, match_score)
}
