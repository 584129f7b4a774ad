//! Integration tests for `HttpScorer` using wiremock HTTP mocks.

use std::time::Duration;

use pulse_core::MonitoredEntity;
use pulse_pipeline::{HttpScorer, ScorerError, SentimentScorer};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn entity() -> MonitoredEntity {
    MonitoredEntity {
        id: 1,
        name: "Emaar".to_string(),
        native_name: Some("إعمار".to_string()),
        entity_type: "organization".to_string(),
        aliases: vec!["Emaar Properties".to_string()],
        is_active: true,
    }
}

fn scorer(server: &MockServer) -> HttpScorer {
    HttpScorer::new(&format!("{}/score", server.uri()), Duration::from_secs(2))
        .expect("scorer construction should not fail")
}

#[tokio::test]
async fn posts_text_with_entity_context() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/score"))
        .and(body_partial_json(serde_json::json!({
            "text": "Emaar posts record profit",
            "entity": { "name": "Emaar", "native_name": "إعمار" }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "score": 0.62, "confidence": 0.9 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let reading = scorer(&server)
        .score("Emaar posts record profit", &entity())
        .await
        .expect("score should parse");

    assert!((reading.score - 0.62).abs() < 1e-9);
    assert!((reading.confidence - 0.9).abs() < 1e-9);
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/score"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = scorer(&server)
        .score("text", &entity())
        .await
        .expect_err("503 should fail");
    assert!(matches!(err, ScorerError::Status(503)));
}

#[tokio::test]
async fn out_of_range_reading_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/score"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "score": 4.0, "confidence": 0.5 })),
        )
        .mount(&server)
        .await;

    let err = scorer(&server)
        .score("text", &entity())
        .await
        .expect_err("score outside [-1, 1] should fail");
    assert!(matches!(err, ScorerError::InvalidResponse(_)));
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/score"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = scorer(&server)
        .score("text", &entity())
        .await
        .expect_err("non-JSON body should fail");
    assert!(matches!(err, ScorerError::InvalidResponse(_)));
}
