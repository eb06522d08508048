//! End-to-end pipeline tests against a tempfile-backed identity store and a
//! wiremock-mocked upstream provider, matching the literal scenarios in the
//! gateway's contract.

use agentgate_core::{GatewayConfig, Tier};
use agentgate_gateway::app::AppState;
use agentgate_gateway::error::GatewayError;
use agentgate_gateway::orchestrator::handle_chat;
use agentgate_identity::IdentityStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_state(upstream: &MockServer) -> AppState {
    let mut config = GatewayConfig::default();
    config.openai_base_url = Some(upstream.uri());
    config.anthropic_base_url = Some(upstream.uri());
    let identities = IdentityStore::open_in_memory().unwrap();
    AppState::new(config, identities)
}

async fn mock_openai_reply(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": content}}]
        })))
        .mount(server)
        .await;
}

async fn mock_anthropic_reply(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{"type": "text", "text": content}]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn first_contact_scenario() {
    // first contact: key "sk-AAAA", message "Hello, this is wonderful".
    let server = MockServer::start().await;
    mock_openai_reply(&server, "Hi! Great to meet you.").await;
    let state = test_state(&server).await;

    let outcome = handle_chat(&state, "sk-AAAA", "openai", "Hello, this is wonderful", None)
        .await
        .unwrap();

    assert_eq!(outcome.identity.calls_today, 1);
    assert_eq!(outcome.identity.calls_total, 1);
    assert_eq!(outcome.identity.memory_size, 2);
    assert!((outcome.identity.sentiment - 0.03).abs() < 1e-9);
}

#[tokio::test]
async fn free_tier_daily_exhaustion() {
    // the 100th successful call of the day is admitted,
    // the 101st is rejected. Pre-seed calls_today=99 rather than looping a
    // real 100 calls, since the per-minute axis (limit 10) would otherwise
    // reject long before the daily axis ever gets exercised.
    let server = MockServer::start().await;
    mock_openai_reply(&server, "ok").await;
    let state = test_state(&server).await;

    let fp = state.identities.fingerprint("sk-daily");
    let (mut identity, _) = state.identities.resolve_or_create(&fp).unwrap();
    identity.calls_today = 99;
    identity.last_call_date = Some(agentgate_core::time::today().format("%Y-%m-%d").to_string());
    state.identities.save(&identity).unwrap();

    handle_chat(&state, "sk-daily", "openai", "hi", None)
        .await
        .unwrap();

    let err = handle_chat(&state, "sk-daily", "openai", "hi", None)
        .await
        .unwrap_err();

    match err {
        GatewayError::RateRejected(rejection, _upgrade_url) => {
            assert_eq!(rejection.reason, agentgate_identity::RejectReason::DailyExhausted);
            assert_eq!(rejection.reset_hint(), "tomorrow");
        }
        other => panic!("expected RateRejected, got {other:?}"),
    }

    let fp = state.identities.fingerprint("sk-daily");
    let identity = state.identities.load(&fp).unwrap().unwrap();
    assert_eq!(identity.calls_today, 100);
}

#[tokio::test]
async fn provider_switch_continuity() {
    // first call via openai, second via anthropic continues
    // with the prior turns spliced into the request.
    let server = MockServer::start().await;
    mock_openai_reply(&server, "first reply").await;
    mock_anthropic_reply(&server, "continuing now").await;
    let state = test_state(&server).await;

    handle_chat(&state, "sk-switch", "openai", "hello", None)
        .await
        .unwrap();
    let outcome = handle_chat(&state, "sk-switch", "anthropic", "continue", None)
        .await
        .unwrap();

    assert_eq!(outcome.response, "continuing now");
    assert_eq!(outcome.identity.memory_size, 4);
}

#[tokio::test]
async fn pro_tier_memory_eviction() {
    // pro identity at exactly 100 entries; one more
    // successful call keeps the ring at 100, evicting the two oldest.
    let server = MockServer::start().await;
    mock_openai_reply(&server, "ack").await;
    let state = test_state(&server).await;

    let fp = state.identities.fingerprint("sk-pro");
    let (mut identity, _) = state.identities.resolve_or_create(&fp).unwrap();
    identity.tier = Tier::Pro;
    for i in 0..100 {
        agentgate_memory::ring::append(
            &mut identity.memory,
            Tier::Pro,
            agentgate_memory::Role::User,
            &format!("turn {i}"),
            i as i64,
        );
    }
    state.identities.save(&identity).unwrap();

    let outcome = handle_chat(&state, "sk-pro", "openai", "one more", None)
        .await
        .unwrap();

    assert_eq!(outcome.identity.memory_size, 100);
    let identity = state.identities.load(&fp).unwrap().unwrap();
    assert_eq!(identity.memory.first().unwrap().content, "turn 2");
}

#[tokio::test]
async fn tier_upgrade_applies_immediately() {
    // admin tier mutation, no other field changes.
    let server = MockServer::start().await;
    mock_openai_reply(&server, "ack").await;
    let state = test_state(&server).await;

    let fp = state.identities.fingerprint("sk-upgrade");
    let (identity, _) = state.identities.resolve_or_create(&fp).unwrap();
    let original_id = identity.id.clone();

    let mut identity = state.identities.load(&fp).unwrap().unwrap();
    identity.tier = Tier::Pro;
    state.identities.save(&identity).unwrap();

    let reloaded = state.identities.load(&fp).unwrap().unwrap();
    assert_eq!(reloaded.tier, Tier::Pro);
    assert_eq!(reloaded.id, original_id);
}

#[tokio::test]
async fn upstream_failure_leaves_counters_and_memory_unchanged() {
    // upstream returns an error; no side effects commit.
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let state = test_state(&server).await;

    let fp = state.identities.fingerprint("sk-fail");
    let (identity, _) = state.identities.resolve_or_create(&fp).unwrap();
    assert_eq!(identity.calls_today, 0);

    let err = handle_chat(&state, "sk-fail", "openai", "hi", None)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Upstream(_)));

    let identity = state.identities.load(&fp).unwrap().unwrap();
    assert_eq!(identity.calls_today, 0);
    assert_eq!(identity.calls_total, 0);
    assert!(identity.memory.is_empty());
}

#[tokio::test]
async fn missing_key_is_rejected_before_any_identity_side_effects() {
    let server = MockServer::start().await;
    let state = test_state(&server).await;

    let err = handle_chat(&state, "", "openai", "hi", None).await.unwrap_err();
    assert!(matches!(err, GatewayError::AuthMissing));
}

#[tokio::test]
async fn empty_message_is_rejected() {
    let server = MockServer::start().await;
    let state = test_state(&server).await;

    let err = handle_chat(&state, "sk-empty", "openai", "   ", None)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::ValidationError));
}

#[tokio::test]
async fn rate_rejected_error_carries_the_configured_upgrade_url() {
    let server = MockServer::start().await;
    let mut state = test_state(&server).await;
    state.config.upgrade_url = "https://agentgate.example/pricing".to_string();

    let fp = state.identities.fingerprint("sk-upgrade-url");
    let (mut identity, _) = state.identities.resolve_or_create(&fp).unwrap();
    identity.calls_today = 100;
    identity.last_call_date = Some(agentgate_core::time::today().format("%Y-%m-%d").to_string());
    state.identities.save(&identity).unwrap();

    let err = handle_chat(&state, "sk-upgrade-url", "openai", "hi", None)
        .await
        .unwrap_err();

    match err {
        GatewayError::RateRejected(_, upgrade_url) => {
            assert_eq!(upgrade_url, "https://agentgate.example/pricing");
        }
        other => panic!("expected RateRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn configured_per_minute_override_rejects_before_the_tier_default_would() {
    // a `gateway.toml` tier-limit table tightens the free tier to 1 call a
    // minute; the second call in the same window is rejected even though the
    // hardcoded default (10/minute) would still have admitted it.
    let server = MockServer::start().await;
    mock_openai_reply(&server, "ok").await;
    let mut state = test_state(&server).await;
    state.config.limits.overrides.push(agentgate_core::config::TierOverride {
        tier: "free".to_string(),
        per_minute: Some(1),
        per_day: None,
        memory_capacity: None,
    });

    handle_chat(&state, "sk-override", "openai", "hi", None)
        .await
        .unwrap();
    let err = handle_chat(&state, "sk-override", "openai", "hi again", None)
        .await
        .unwrap_err();

    match err {
        GatewayError::RateRejected(rejection, _upgrade_url) => {
            assert_eq!(rejection.reason, agentgate_identity::RejectReason::RateExceeded);
        }
        other => panic!("expected RateRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn long_message_is_truncated_in_storage_but_sent_in_full_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(move |req: &wiremock::Request| {
            let body: serde_json::Value = req.body_json().unwrap();
            let first_message = body["messages"].as_array().unwrap().last().unwrap();
            let sent_content = first_message["content"].as_str().unwrap();
            assert_eq!(sent_content.chars().count(), 501);
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "ack"}}]
            }))
        })
        .mount(&server)
        .await;
    let state = test_state(&server).await;

    let long_message: String = std::iter::repeat('x').take(501).collect();
    let outcome = handle_chat(&state, "sk-long", "openai", &long_message, None)
        .await
        .unwrap();

    assert_eq!(outcome.identity.memory_size, 2);
    let fp = state.identities.fingerprint("sk-long");
    let identity = state.identities.load(&fp).unwrap().unwrap();
    assert_eq!(identity.memory[0].content.chars().count(), 500);
}
