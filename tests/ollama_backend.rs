//! Integration tests for the Ollama HTTP backend
//!
//! Uses wiremock servers to check how real HTTP behavior maps onto probe
//! failures and analysis errors.

use serde_json::json;
use std::time::Duration;
use vision_analyzer::analysis::{AnalysisError, AnalysisRequest, ImageAttachment};
use vision_analyzer::backend::{InferenceBackend, OllamaClient};
use vision_analyzer::resolver::{Endpoint, ProbeFailure};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

fn client() -> OllamaClient {
    OllamaClient::new(Duration::from_millis(500), Duration::from_secs(5))
        .expect("should build client")
}

fn endpoint_for(server: &MockServer) -> Endpoint {
    Endpoint::new("127.0.0.1", server.address().port())
}

fn request(model: &str) -> AnalysisRequest {
    let image = ImageAttachment::from_bytes("cat.png", PNG_BYTES.to_vec()).unwrap();
    AnalysisRequest::new(model, "What is in this picture?", image).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Listing / probe
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_returns_tags_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": "llava:7b" }, { "name": "mistral:7b" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client().list(&endpoint_for(&server)).await.unwrap();

    assert_eq!(payload["models"][0]["name"], "llava:7b");
}

#[tokio::test]
async fn test_list_server_error_is_protocol_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let failure = client().list(&endpoint_for(&server)).await.unwrap_err();

    assert_eq!(failure.kind(), "protocol");
}

#[tokio::test]
async fn test_list_non_json_is_protocol_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>It works!</body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let failure = client().list(&endpoint_for(&server)).await.unwrap_err();

    match failure {
        ProbeFailure::Protocol(reason) => assert!(reason.contains("did not return JSON")),
        other => panic!("expected Protocol, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_listing_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "models": [] }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let failure = client().list(&endpoint_for(&server)).await.unwrap_err();

    assert_eq!(
        failure,
        ProbeFailure::Timeout {
            after: Duration::from_millis(500)
        }
    );
}

#[tokio::test]
async fn test_closed_port_is_refused() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let failure = client()
        .list(&Endpoint::new("127.0.0.1", port))
        .await
        .unwrap_err();

    assert_eq!(failure.kind(), "refused");
}

// ─────────────────────────────────────────────────────────────────────────────
// Generation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_generate_sends_image_and_returns_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "llava:7b",
            "prompt": "What is in this picture?",
            "images": ["iVBORw0KGgo="],
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llava:7b",
            "response": "A cat sitting on a windowsill.",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = client()
        .generate(&endpoint_for(&server), &request("llava:7b"))
        .await
        .unwrap();

    assert_eq!(text, "A cat sitting on a windowsill.");
}

#[tokio::test]
async fn test_generate_missing_model_is_unknown_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({ "error": "model 'llava:34b' not found" })),
        )
        .mount(&server)
        .await;

    let err = client()
        .generate(&endpoint_for(&server), &request("llava:34b"))
        .await
        .unwrap_err();

    match err {
        AnalysisError::UnknownModel { model, .. } => assert_eq!(model, "llava:34b"),
        other => panic!("expected UnknownModel, got {:?}", other),
    }
}

#[tokio::test]
async fn test_generate_rejected_image_is_malformed_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "illegal base64 data in image" })),
        )
        .mount(&server)
        .await;

    let err = client()
        .generate(&endpoint_for(&server), &request("llava:7b"))
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::MalformedImage(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_generate_other_failure_keeps_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "out of memory" })),
        )
        .mount(&server)
        .await;

    let err = client()
        .generate(&endpoint_for(&server), &request("llava:7b"))
        .await
        .unwrap_err();

    match err {
        AnalysisError::Backend { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "out of memory");
        }
        other => panic!("expected Backend, got {:?}", other),
    }
}

#[tokio::test]
async fn test_generate_reply_without_response_field_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "done": true })))
        .mount(&server)
        .await;

    let err = client()
        .generate(&endpoint_for(&server), &request("llava:7b"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "protocol");
}

#[tokio::test]
async fn test_slow_generation_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "late" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = OllamaClient::new(Duration::from_secs(1), Duration::from_millis(300)).unwrap();
    let err = client
        .generate(&endpoint_for(&server), &request("llava:7b"))
        .await
        .unwrap_err();

    match err {
        AnalysisError::Timeout { after, .. } => assert_eq!(after, Duration::from_millis(300)),
        other => panic!("expected Timeout, got {:?}", other),
    }
}
