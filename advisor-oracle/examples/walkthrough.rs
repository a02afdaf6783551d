//! Walks one profile through both decryption cycles with the synchronous
//! oracle and prints each step.
//!
//! ```text
//! cargo run -p advisor-oracle --example walkthrough
//! ```

use std::error::Error;
use std::sync::Arc;

use advisor_core::{
    AdvisorConfig, CallbackOutcome, ClientId, ConfidentialAdvisor, ConfidentialBackend,
    MemoryEventLog, Subject,
};
use advisor_oracle::{LocalOracle, OracleConfig, OracleNode};

fn main() -> Result<(), Box<dyn Error>> {
    let node = Arc::new(OracleNode::from_config(&OracleConfig::sample("walkthrough"))?);
    let config = AdvisorConfig {
        oracle: node.trust_config(),
        ..AdvisorConfig::default()
    };
    let log = MemoryEventLog::new();
    let mut advisor =
        ConfidentialAdvisor::new(&config, LocalOracle::new(Arc::clone(&node)), node.coprocessor())?
            .with_event_sink(Arc::new(log.clone()));

    let coprocessor = node.coprocessor();
    let income = coprocessor.encrypt_u32(50_000)?;
    let assets = coprocessor.encrypt_u32(600_000)?;
    let risk = coprocessor.encrypt_u32(80)?;
    let goals = coprocessor.encrypt_u32(1)?;
    let profile = advisor.submit(income, assets, risk, goals, 0)?;
    println!("submitted {profile}");

    let client = ClientId::new("walkthrough");
    let request = advisor.request_decrypt(&client, Subject::Profile(profile), 1)?;
    println!("requested {request}");
    let callback = advisor
        .oracle_mut()
        .deliver_next()
        .ok_or("oracle queue empty")??;
    let recommendation_id = match advisor.on_callback(&callback, 2)? {
        CallbackOutcome::RecommendationGenerated {
            recommendation_id, ..
        } => recommendation_id,
        other => return Err(format!("unexpected outcome {other:?}").into()),
    };
    println!("generated {recommendation_id}");

    advisor.request_decrypt(&client, Subject::Recommendation(recommendation_id), 3)?;
    let callback = advisor
        .oracle_mut()
        .deliver_next()
        .ok_or("oracle queue empty")??;
    advisor.on_callback(&callback, 4)?;

    let result = advisor.revealed_result(recommendation_id)?;
    println!(
        "revealed product={} score={} ({} events)",
        result.product_id,
        result.match_score,
        log.len()
    );
    println!("{}", serde_json::to_string_pretty(&advisor.snapshot())?);
    Ok(())
}
