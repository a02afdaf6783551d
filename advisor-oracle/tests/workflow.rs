use std::sync::Arc;
use std::time::Duration;

use advisor_core::{
    AdvisorConfig, AdvisorError, CallbackOutcome, ClientId, ConfidentialAdvisor,
    ConfidentialBackend, FinancialAttributes, MemoryEventLog, ProfileId, RecommendationId,
    RequestState, RevealedResult, Scored, ScoringPolicy, Subject,
};
use advisor_oracle::{channel, Coprocessor, LocalOracle, OracleConfig, OracleNode};
use pretty_assertions::assert_eq;

const T0: u64 = 1_700_000_000_000;

type LocalAdvisor = ConfidentialAdvisor<LocalOracle, Arc<Coprocessor>>;

fn setup() -> (LocalAdvisor, Arc<OracleNode>, MemoryEventLog) {
    let node = Arc::new(OracleNode::from_config(&OracleConfig::sample("it-node")).expect("node"));
    let config = AdvisorConfig {
        oracle: node.trust_config(),
        ..AdvisorConfig::default()
    };
    let log = MemoryEventLog::new();
    let advisor = ConfidentialAdvisor::new(
        &config,
        LocalOracle::new(Arc::clone(&node)),
        node.coprocessor(),
    )
    .expect("advisor")
    .with_event_sink(Arc::new(log.clone()));
    (advisor, node, log)
}

fn submit(advisor: &mut LocalAdvisor, node: &OracleNode, values: [u32; 4]) -> ProfileId {
    let coprocessor = node.coprocessor();
    let [income, assets, risk, goals] =
        values.map(|v| coprocessor.encrypt_u32(v).expect("encrypt"));
    advisor
        .submit(income, assets, risk, goals, T0)
        .expect("submit")
}

fn client() -> ClientId {
    ClientId::new("integration")
}

fn run_cycle(advisor: &mut LocalAdvisor, subject: Subject) -> CallbackOutcome {
    advisor
        .request_decrypt(&client(), subject, T0)
        .expect("request");
    let callback = advisor
        .oracle_mut()
        .deliver_next()
        .expect("queued")
        .expect("fulfilled");
    advisor.on_callback(&callback, T0 + 1).expect("callback")
}

fn reveal_for(values: [u32; 4]) -> RevealedResult {
    let (mut advisor, node, _) = setup();
    let profile = submit(&mut advisor, &node, values);
    let CallbackOutcome::RecommendationGenerated {
        recommendation_id, ..
    } = run_cycle(&mut advisor, Subject::Profile(profile))
    else {
        panic!("expected a recommendation");
    };
    match run_cycle(&mut advisor, Subject::Recommendation(recommendation_id)) {
        CallbackOutcome::ResultRevealed { result, .. } => result,
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn high_risk_profile_reveals_product_three() {
    assert_eq!(
        reveal_for([50_000, 600_000, 80, 1]),
        RevealedResult {
            product_id: 3,
            match_score: 100,
            is_revealed: true
        }
    );
}

#[test]
fn high_income_goal_profile_reveals_product_two() {
    assert_eq!(
        reveal_for([150_000, 10_000, 10, 2]),
        RevealedResult {
            product_id: 2,
            match_score: 45,
            is_revealed: true
        }
    );
}

#[test]
fn fallback_profile_reveals_product_one() {
    assert_eq!(
        reveal_for([10_000, 1_000, 5, 0]),
        RevealedResult {
            product_id: 1,
            match_score: 6,
            is_revealed: true
        }
    );
}

struct Flat;

impl ScoringPolicy for Flat {
    fn score(&self, _: &FinancialAttributes) -> Scored {
        Scored {
            product_id: 9,
            match_score: 50,
        }
    }
}

#[test]
fn installed_scoring_policy_drives_recommendations() {
    let (advisor, node, _) = setup();
    let mut advisor = advisor.with_scoring_policy(Box::new(Flat));
    let profile = submit(&mut advisor, &node, [50_000, 600_000, 80, 1]);
    let CallbackOutcome::RecommendationGenerated {
        recommendation_id, ..
    } = run_cycle(&mut advisor, Subject::Profile(profile))
    else {
        panic!("expected a recommendation");
    };

    let stored = advisor
        .recommendation(recommendation_id)
        .expect("stored")
        .clone();
    let coprocessor = node.coprocessor();
    assert_eq!(
        coprocessor
            .decrypt(&stored.encrypted_product_id.to_opaque_handle())
            .expect("product"),
        9
    );
    assert_eq!(
        coprocessor
            .decrypt(&stored.encrypted_match_score.to_opaque_handle())
            .expect("score"),
        50
    );
}

#[test]
fn duplicate_callback_does_not_touch_recommendation() {
    let (mut advisor, node, log) = setup();
    let profile = submit(&mut advisor, &node, [150_000, 10_000, 10, 2]);
    let request = advisor
        .request_decrypt(&client(), Subject::Profile(profile), T0)
        .expect("request");
    let callback = advisor
        .oracle_mut()
        .fulfil(request)
        .expect("queued")
        .expect("fulfilled");

    advisor.on_callback(&callback, T0 + 1).expect("first");
    let recommendation = advisor.recommendations_for_profile(profile)[0].clone();

    assert_eq!(
        advisor.on_callback(&callback, T0 + 2),
        Err(AdvisorError::UnknownRequest(request))
    );
    assert_eq!(advisor.recommendation_count(), 1);
    assert_eq!(
        advisor.recommendation(recommendation.id).expect("stored"),
        &recommendation
    );
    assert_eq!(log.count("recommendation_generated"), 1);
}

#[test]
fn callback_from_foreign_oracle_is_rejected() {
    let (mut advisor, node, _) = setup();
    let profile = submit(&mut advisor, &node, [1, 2, 3, 4]);
    let request = advisor
        .request_decrypt(&client(), Subject::Profile(profile), T0)
        .expect("request");

    // Same ciphertexts, but signed by a node the advisor does not trust.
    let rogue = OracleNode::from_config(&OracleConfig {
        secret_seed: "3333333333333333333333333333333333333333333333333333333333333333".into(),
        ..OracleConfig::sample("rogue")
    })
    .expect("rogue node");
    let pending = advisor.pending(request).expect("pending").clone();
    let honest = node
        .fulfil(
            request,
            &advisor_core::DecryptionRequest {
                handles: pending.handles.clone(),
                selector: pending.kind(),
            },
        )
        .expect("honest");
    let forged = advisor_core::DecryptionCallback {
        proof: rogue
            .signers()
            .prove(request, &pending.handles, &honest.plaintext),
        ..honest
    };

    assert!(matches!(
        advisor.on_callback(&forged, T0 + 1),
        Err(AdvisorError::InvalidProof(_))
    ));
    assert_eq!(
        advisor.request_state(Subject::Profile(profile)),
        RequestState::Requested(request)
    );
}

#[test]
fn out_of_order_delivery_resolves_each_subject() {
    let (mut advisor, node, _) = setup();
    let first = submit(&mut advisor, &node, [50_000, 600_000, 80, 1]);
    let second = submit(&mut advisor, &node, [10_000, 1_000, 5, 0]);
    let req_first = advisor
        .request_decrypt(&client(), Subject::Profile(first), T0)
        .expect("first");
    let req_second = advisor
        .request_decrypt(&client(), Subject::Profile(second), T0)
        .expect("second");

    let late = advisor
        .oracle_mut()
        .fulfil(req_second)
        .expect("queued")
        .expect("fulfilled");
    advisor.on_callback(&late, T0 + 1).expect("second applied");
    let early = advisor
        .oracle_mut()
        .fulfil(req_first)
        .expect("queued")
        .expect("fulfilled");
    advisor.on_callback(&early, T0 + 2).expect("first applied");

    let coprocessor = node.coprocessor();
    let product_of = |profile| {
        let rec = advisor.recommendations_for_profile(profile)[0];
        coprocessor
            .decrypt(&rec.encrypted_product_id.to_opaque_handle())
            .expect("decrypt")
    };
    assert_eq!(product_of(first), 3);
    assert_eq!(product_of(second), 1);
}

#[test]
fn revealing_twice_is_refused() {
    let (mut advisor, node, _) = setup();
    let profile = submit(&mut advisor, &node, [1, 2, 3, 4]);
    run_cycle(&mut advisor, Subject::Profile(profile));
    let rec = RecommendationId(1);
    run_cycle(&mut advisor, Subject::Recommendation(rec));
    assert_eq!(
        advisor.request_decrypt(&client(), Subject::Recommendation(rec), T0),
        Err(AdvisorError::AlreadyRevealed(rec))
    );
    assert_eq!(advisor.oracle_mut().queued(), 0);
}

#[tokio::test]
async fn channel_oracle_drives_full_workflow() {
    let node = Arc::new(OracleNode::from_config(&OracleConfig::sample("async")).expect("node"));
    let config = AdvisorConfig {
        oracle: node.trust_config(),
        ..AdvisorConfig::default()
    };
    let (oracle, worker, mut callbacks) = channel(Arc::clone(&node), 16);
    let worker = worker.spawn();
    let mut advisor =
        ConfidentialAdvisor::new(&config, oracle, node.coprocessor()).expect("advisor");

    let coprocessor = node.coprocessor();
    let [income, assets, risk, goals] =
        [150_000, 10_000, 10, 2].map(|v| coprocessor.encrypt_u32(v).expect("encrypt"));
    let profile = advisor
        .submit(income, assets, risk, goals, T0)
        .expect("submit");

    advisor
        .request_decrypt(&client(), Subject::Profile(profile), T0)
        .expect("request profile");
    let callback = tokio::time::timeout(Duration::from_secs(5), callbacks.recv())
        .await
        .expect("in time")
        .expect("callback");
    let CallbackOutcome::RecommendationGenerated {
        recommendation_id, ..
    } = advisor.on_callback(&callback, T0 + 1).expect("applied")
    else {
        panic!("expected a recommendation");
    };

    advisor
        .request_decrypt(&client(), Subject::Recommendation(recommendation_id), T0 + 2)
        .expect("request reveal");
    let callback = tokio::time::timeout(Duration::from_secs(5), callbacks.recv())
        .await
        .expect("in time")
        .expect("callback");
    advisor.on_callback(&callback, T0 + 3).expect("revealed");

    assert_eq!(
        advisor.revealed_result(recommendation_id).expect("result"),
        RevealedResult {
            product_id: 2,
            match_score: 45,
            is_revealed: true
        }
    );

    drop(advisor);
    let stats = worker.await.expect("worker");
    assert_eq!(stats.fulfilled, 2);
}
