//! Ollama provider against a mocked `/api/chat` endpoint.

#![cfg(feature = "ollama")]

use std::time::Duration;

use tessera_inference::{complete_within, CompletionProvider, OllamaProvider};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_reply(content: &str) -> serde_json::Value {
    serde_json::json!({
        "model": "test-gen",
        "message": { "role": "assistant", "content": content },
        "done": true
    })
}

#[tokio::test]
async fn test_complete_sends_system_and_user_messages() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "model": "test-gen",
            "stream": false,
            "messages": [
                { "role": "system", "content": "be brief" },
                { "role": "user", "content": "hello" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("hi there")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OllamaProvider::with_config(mock_server.uri(), "test-gen".to_string());
    let completion = provider.complete("be brief", "hello").await.unwrap();

    assert_eq!(completion.text, "hi there");
    assert_eq!(completion.model, "test-gen");
}

#[tokio::test]
async fn test_server_error_is_inference_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&mock_server)
        .await;

    let provider = OllamaProvider::with_config(mock_server.uri(), "test-gen".to_string());
    let err = provider.complete("", "hello").await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_slow_server_falls_back_after_deadline() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_reply("too late"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let provider = OllamaProvider::with_config(mock_server.uri(), "test-gen".to_string());
    let out = complete_within(Some(&provider), Duration::from_millis(200), "", "hello").await;
    assert!(out.is_none());
}

#[tokio::test]
async fn test_health_check() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
        .mount(&mock_server)
        .await;

    let provider = OllamaProvider::with_config(mock_server.uri(), "test-gen".to_string());
    assert!(provider.health_check().await.unwrap());
}
