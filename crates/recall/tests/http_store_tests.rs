//! Integration tests for the HTTP tier store clients
//!
//! Runs `HttpMemoryStore` and `HttpRuleStore` against a wiremock server
//! speaking the tier store wire protocol, covering the happy path, error
//! statuses, and malformed replies.

use serde_json::json;
use uuid::Uuid;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

use recall::RecallError;
use recall::config::TierConfig;
use recall::memory::types::{MemoryRecord, MemoryTier, Rule};
use recall::store::{HttpMemoryStore, HttpRuleStore, MemoryStore, RuleStore};

fn record_json(content: &str, score: f32) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "content": content,
        "summary": content,
        "score": score,
        "created_at": chrono::Utc::now().to_rfc3339(),
    })
}

async fn memory_store(server: &MockServer, tier: MemoryTier) -> HttpMemoryStore {
    let config = TierConfig::with_endpoint(server.uri());
    HttpMemoryStore::new(tier, &config).unwrap()
}

async fn rule_store(server: &MockServer) -> HttpRuleStore {
    let config = TierConfig::with_endpoint(server.uri());
    HttpRuleStore::new(&config).unwrap()
}

#[tokio::test]
async fn test_retrieve_sends_query_and_decodes_records() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/query"))
        .and(matchers::body_json(json!({
            "query": "rust memory",
            "limit": 3
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                record_json("closest match", 0.95),
                record_json("second match", 0.70),
            ]
        })))
        .mount(&server)
        .await;

    let store = memory_store(&server, MemoryTier::Episodic).await;
    let records = store.retrieve("rust memory", 3).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].content, "closest match");
    assert_eq!(records[1].content, "second match");
}

#[tokio::test]
async fn test_retrieve_zero_limit_skips_the_network() {
    // No mock mounted; a request would 404 and fail the call
    let server = MockServer::start().await;
    let store = memory_store(&server, MemoryTier::Semantic).await;

    let records = store.retrieve("anything", 0).await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_retrieve_accepts_records_without_optional_fields() {
    let server = MockServer::start().await;

    // score and metadata are optional on the wire
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{
                "id": Uuid::new_v4(),
                "content": "bare record",
                "summary": "bare",
                "created_at": chrono::Utc::now().to_rfc3339(),
            }]
        })))
        .mount(&server)
        .await;

    let store = memory_store(&server, MemoryTier::Semantic).await;
    let records = store.retrieve("bare", 5).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].score, 0.0);
    assert!(records[0].metadata.is_empty());
}

#[tokio::test]
async fn test_retrieve_error_status_names_the_tier() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/query"))
        .respond_with(ResponseTemplate::new(500).set_body_string("index unavailable"))
        .mount(&server)
        .await;

    let store = memory_store(&server, MemoryTier::Episodic).await;
    let err = store.retrieve("anything", 3).await.unwrap_err();

    match err {
        RecallError::Store(message) => {
            assert!(message.contains("episodic"));
            assert!(message.contains("500"));
            assert!(message.contains("index unavailable"));
        }
        other => panic!("expected store error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_retrieve_malformed_reply_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let store = memory_store(&server, MemoryTier::Semantic).await;
    let err = store.retrieve("anything", 3).await.unwrap_err();
    assert!(matches!(err, RecallError::Store(_)));
}

#[tokio::test]
async fn test_store_posts_record_and_returns_id() {
    let server = MockServer::start().await;
    let record = MemoryRecord::new("conversation summary", "summary");

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/records"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": record.id })),
        )
        .mount(&server)
        .await;

    let store = memory_store(&server, MemoryTier::Episodic).await;
    let id = store.store(&record).await.unwrap();
    assert_eq!(id, record.id);
}

#[tokio::test]
async fn test_store_error_status_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/records"))
        .respond_with(ResponseTemplate::new(503).set_body_string("write path down"))
        .mount(&server)
        .await;

    let store = memory_store(&server, MemoryTier::Episodic).await;
    let record = MemoryRecord::new("content", "summary");
    let err = store.store(&record).await.unwrap_err();
    assert!(matches!(err, RecallError::Store(_)));
}

#[tokio::test]
async fn test_clear_reports_removed_count() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("DELETE"))
        .and(matchers::path("/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "removed": 7 })))
        .mount(&server)
        .await;

    let store = memory_store(&server, MemoryTier::Semantic).await;
    assert_eq!(store.clear().await.unwrap(), 7);
}

#[tokio::test]
async fn test_trailing_slash_in_endpoint_is_tolerated() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "records": [] })))
        .mount(&server)
        .await;

    let config = TierConfig::with_endpoint(format!("{}/", server.uri()));
    let store = HttpMemoryStore::new(MemoryTier::Episodic, &config).unwrap();
    assert!(store.retrieve("anything", 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_active_rules_filters_inactive() {
    let server = MockServer::start().await;

    let active = Rule::new("Answer concisely");
    let mut retired = Rule::new("Old behavior");
    retired.active = false;

    Mock::given(matchers::method("GET"))
        .and(matchers::path("/rules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rules": [active.clone(), retired]
        })))
        .mount(&server)
        .await;

    let store = rule_store(&server).await;
    let rules = store.active_rules().await.unwrap();

    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].id, active.id);
}

#[tokio::test]
async fn test_upsert_rule_puts_and_returns_id() {
    let server = MockServer::start().await;
    let rule = Rule::new("Prefer examples over prose");

    Mock::given(matchers::method("PUT"))
        .and(matchers::path("/rules"))
        .and(matchers::body_json(rule.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": rule.id })))
        .mount(&server)
        .await;

    let store = rule_store(&server).await;
    assert_eq!(store.upsert_rule(&rule).await.unwrap(), rule.id);
}

#[tokio::test]
async fn test_rule_store_error_status_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("GET"))
        .and(matchers::path("/rules"))
        .respond_with(ResponseTemplate::new(500).set_body_string("rules table locked"))
        .mount(&server)
        .await;

    let store = rule_store(&server).await;
    let err = store.active_rules().await.unwrap_err();

    match err {
        RecallError::Store(message) => assert!(message.contains("procedural")),
        other => panic!("expected store error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rule_clear_reports_removed_count() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("DELETE"))
        .and(matchers::path("/rules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "removed": 2 })))
        .mount(&server)
        .await;

    let store = rule_store(&server).await;
    assert_eq!(store.clear().await.unwrap(), 2);
}
