mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use pest_advisor::cache::TieredResponseCache;
use pest_advisor::clock::{self, ManualClock};
use pest_advisor::inference::{ChatMessage, GenerationOrigin, InferenceClient};
use pest_advisor::resilience::CircuitState;
use pest_advisor::AdvisorConfig;

use common::{dead_backend_url, start_mock_backend, test_config, LONG_ANSWER};

fn client_for(config: &AdvisorConfig) -> InferenceClient {
    let cache = Arc::new(TieredResponseCache::new(&config.cache, clock::system()));
    InferenceClient::new(config, cache, clock::system()).unwrap()
}

#[tokio::test]
async fn test_generate_then_exact_cache_hit() {
    let backend = start_mock_backend().await;
    let client = client_for(&test_config(&backend.url()));
    assert!(client.refresh_availability().await);
    let after_probe = backend.state.generates();

    let first = client.generate("How do I control aphids on roses?", None, None, None).await;
    assert_eq!(first.origin, GenerationOrigin::Backend);
    assert_eq!(first.text, LONG_ANSWER);
    assert_eq!(first.model, "llama3");

    let second = client.generate("How do I control aphids on roses?", None, None, None).await;
    assert_eq!(second.origin, GenerationOrigin::ExactCache);
    assert_eq!(backend.state.generates(), after_probe + 1);
}

#[tokio::test]
async fn test_semantic_cache_hit() {
    let backend = start_mock_backend().await;
    let client = client_for(&test_config(&backend.url()));
    assert!(client.refresh_availability().await);

    client.generate("How do I control aphids on tomatoes?", None, None, None).await;
    let calls = backend.state.generates();

    let similar = client.generate("How can I control aphids on my tomato plants?", None, None, None).await;
    assert_eq!(similar.origin, GenerationOrigin::SemanticCache);
    assert_eq!(backend.state.generates(), calls);

    let unrelated = client.generate("What is the best soil pH for carrots?", None, None, None).await;
    assert_eq!(unrelated.origin, GenerationOrigin::Backend);
}

#[tokio::test]
async fn test_retries_transient_failures() {
    let backend = start_mock_backend().await;
    let client = client_for(&test_config(&backend.url()));
    assert!(client.refresh_availability().await);
    let after_probe = backend.state.generates();

    backend.state.fail_first.store(2, Ordering::SeqCst);
    let result = client.generate("When do whiteflies appear on beans?", None, None, None).await;

    assert_eq!(result.origin, GenerationOrigin::Backend);
    assert_eq!(backend.state.generates(), after_probe + 3);
    assert_eq!(client.breakers().generate.state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_breaker_opens_and_stops_network_calls() {
    let backend = start_mock_backend().await;
    let mut config = test_config(&backend.url());
    config.breakers.generate.failure_threshold = 2;
    config.retries.max_attempts = 1;
    let client = client_for(&config);
    assert!(client.refresh_availability().await);

    backend.state.generate_status.store(500, Ordering::SeqCst);
    let a = client.generate("first question about maize pests", None, None, None).await;
    let b = client.generate("second question about bean pests", None, None, None).await;
    assert!(a.is_fallback());
    assert!(b.is_fallback());
    assert_eq!(client.breakers().generate.state(), CircuitState::Open);

    let calls = backend.state.generates();
    let c = client.generate("third question about cassava pests", None, None, None).await;
    assert!(c.is_fallback());
    assert_eq!(backend.state.generates(), calls);
}

#[tokio::test]
async fn test_missing_model_is_not_retried() {
    let backend = start_mock_backend().await;
    let client = client_for(&test_config(&backend.url()));
    assert!(client.refresh_availability().await);
    let after_probe = backend.state.generates();

    backend.state.generate_status.store(404, Ordering::SeqCst);
    let result = client.generate("aphid control on kale", Some("no-such-model"), None, None).await;

    assert!(result.is_fallback());
    assert_eq!(result.model, "no-such-model");
    assert_eq!(backend.state.generates(), after_probe + 1);
}

#[tokio::test]
async fn test_rejected_reply_falls_back() {
    let backend = start_mock_backend().await;
    let client = client_for(&test_config(&backend.url()));
    assert!(client.refresh_availability().await);

    backend.state.set_generate_text("ok");
    let result = client.generate("How do I stop stem borers?", None, None, None).await;
    assert!(result.is_fallback());
    assert!(result.text.starts_with("Our advisory service is temporarily unavailable."));
}

#[tokio::test]
async fn test_unavailable_backend_skips_network_until_refresh_due() {
    let backend = start_mock_backend().await;
    backend.state.set_models(&[]);
    let client = client_for(&test_config(&backend.url()));

    assert!(!client.refresh_availability().await);
    let tags = backend.state.tags();

    let result = client.generate("How do I control aphids on roses?", None, None, None).await;
    assert!(result.is_fallback());
    assert_eq!(backend.state.tags(), tags);
    assert_eq!(backend.state.generates(), 0);
}

#[tokio::test]
async fn test_first_generate_probes_lazily() {
    let backend = start_mock_backend().await;
    let client = client_for(&test_config(&backend.url()));
    assert!(!client.is_available());

    let result = client.generate("How do I control aphids on roses?", None, None, None).await;
    assert_eq!(result.origin, GenerationOrigin::Backend);
    assert!(client.is_available());
    assert_eq!(backend.state.tags(), 1);
}

#[tokio::test]
async fn test_dead_backend_falls_back() {
    let client = client_for(&test_config(&dead_backend_url().await));
    let result = client.generate("My soil is very acidic", None, None, None).await;
    assert!(result.is_fallback());
    assert!(result.text.contains("soil"));
}

#[tokio::test]
async fn test_resolve_model_prefers_installed_default() {
    let backend = start_mock_backend().await;
    backend.state.set_models(&["mistral:7b", "llama3:latest"]);
    let client = client_for(&test_config(&backend.url()));
    assert_eq!(client.resolve_model(None), "llama3");

    assert!(client.refresh_availability().await);
    assert_eq!(client.resolve_model(None), "llama3");
    assert_eq!(client.resolve_model(Some("pest-advisor-control")), "pest-advisor-control");

    backend.state.set_models(&["mistral:7b"]);
    assert!(client.refresh_availability().await);
    assert_eq!(client.resolve_model(None), "mistral:7b");
}

#[tokio::test]
async fn test_chat_turn() {
    let backend = start_mock_backend().await;
    let client = client_for(&test_config(&backend.url()));
    assert!(client.refresh_availability().await);

    let messages = vec![
        ChatMessage::new("system", "You advise farmers."),
        ChatMessage::new("user", "Aphids are on my roses."),
    ];
    let reply = client.chat(&messages, None).await;
    assert_eq!(reply.origin, GenerationOrigin::Backend);
    assert_eq!(reply.text, LONG_ANSWER);
    assert_eq!(backend.state.chat_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_list_models_through_breaker() {
    let backend = start_mock_backend().await;
    let mut config = test_config(&backend.url());
    config.breakers.list_models.failure_threshold = 1;
    config.retries.max_attempts = 1;
    let client = client_for(&config);

    assert_eq!(client.list_models().await.unwrap(), vec!["llama3:latest".to_string()]);

    backend.state.tags_status.store(503, Ordering::SeqCst);
    assert!(client.list_models().await.is_err());
    assert_eq!(client.breakers().list_models.state(), CircuitState::Open);

    let calls = backend.state.tags();
    assert!(client.list_models().await.is_err());
    assert_eq!(backend.state.tags(), calls);
}

#[tokio::test]
async fn test_abandoned_half_open_call_does_not_wedge_breaker() {
    let backend = start_mock_backend().await;
    let mut config = test_config(&backend.url());
    config.breakers.generate.failure_threshold = 1;
    config.breakers.generate.recovery_timeout_secs = 30;
    config.retries.max_attempts = 1;
    let clock = Arc::new(ManualClock::new(1_000_000));
    let cache = Arc::new(TieredResponseCache::new(&config.cache, clock.clone()));
    let client = InferenceClient::new(&config, cache, clock.clone()).unwrap();
    assert!(client.refresh_availability().await);

    backend.state.generate_status.store(500, Ordering::SeqCst);
    assert!(client.generate("first question about maize pests", None, None, None).await.is_fallback());
    assert_eq!(client.breakers().generate.state(), CircuitState::Open);

    // Half-open probe that the caller gives up on.
    backend.state.generate_status.store(200, Ordering::SeqCst);
    backend.state.generate_delay_ms.store(500, Ordering::SeqCst);
    clock.advance(Duration::from_secs(31));
    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        client.generate("second question about bean pests", None, None, None),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(client.breakers().generate.state(), CircuitState::Open);

    backend.state.generate_delay_ms.store(0, Ordering::SeqCst);
    clock.advance(Duration::from_secs(31));
    let healed = client.generate("third question about cassava pests", None, None, None).await;
    assert_eq!(healed.origin, GenerationOrigin::Backend);
    assert_eq!(client.breakers().generate.state(), CircuitState::Closed);
}
