//! End-to-end session tests against a mock Ollama server
//!
//! Exercises the full path a front-end takes: load config, resolve past a
//! dead candidate, list the catalog, then analyze with the pre-selected
//! model.

use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use vision_analyzer::analysis::{AnalysisRequest, DEFAULT_PROMPT, ImageAttachment};
use vision_analyzer::config::Config;
use vision_analyzer::metrics::{Metrics, ResolutionPath};
use vision_analyzer::resolver::Endpoint;
use vision_analyzer::session::Session;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Port that nothing is listening on
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn config_for(live_port: u16, dead_port: u16) -> Config {
    Config::from_str(&format!(
        r#"
[[endpoints]]
host = "127.0.0.1"
port = {dead_port}

[[endpoints]]
host = "127.0.0.1"
port = {live_port}

[probe]
timeout_seconds = 1

[generation]
timeout_seconds = 5
"#
    ))
    .expect("test config should be valid")
}

async fn mock_ollama() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                { "name": "mistral:7b", "size": 4109865159u64 },
                { "name": "moondream:latest", "size": 1738451197u64 },
                { "name": "llava:7b", "size": 4733363377u64 }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llava:7b",
            "response": "Two dogs playing in the snow.",
            "done": true
        })))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_resolve_list_and_analyze() {
    let server = mock_ollama().await;
    let dead_port = closed_port();
    let config = config_for(server.address().port(), dead_port);
    let metrics = Arc::new(Metrics::new().unwrap());
    let mut session = Session::from_config(&config, metrics.clone()).unwrap();

    let connection = session.resolve_connection(false).await.unwrap();
    assert_eq!(
        connection.endpoint(),
        &Endpoint::new("127.0.0.1", server.address().port())
    );
    assert_eq!(connection.failed_attempts().len(), 1);
    assert_eq!(connection.failed_attempts()[0].failure.kind(), "refused");

    let catalog = session.get_model_catalog(&connection).await.unwrap();
    assert_eq!(
        catalog.names(),
        vec!["llava:7b", "moondream:latest", "mistral:7b"]
    );

    let selected = catalog.default_selection().unwrap().name().to_string();
    let image = ImageAttachment::from_bytes("dogs.jpg", vec![0xff, 0xd8, 0xff]).unwrap();
    let request = AnalysisRequest::new(&selected, DEFAULT_PROMPT, image).unwrap();
    let text = session.analyze(&connection, &request).await.unwrap();

    assert_eq!(text, "Two dogs playing in the snow.");
    let exported = metrics.gather().unwrap();
    assert!(exported.contains("vision_analyzer_analyses_total{outcome=\"success\"} 1"));
}

#[tokio::test]
async fn test_second_refresh_reuses_cached_endpoint() {
    let server = mock_ollama().await;
    let config = config_for(server.address().port(), closed_port());
    let metrics = Arc::new(Metrics::new().unwrap());
    let mut session = Session::from_config(&config, metrics.clone()).unwrap();

    session.resolve_connection(false).await.unwrap();
    let again = session.resolve_connection(false).await.unwrap();

    assert!(again.from_cache());
    assert!(again.failed_attempts().is_empty());
    assert_eq!(metrics.resolution_count(ResolutionPath::Sweep), 1);
    assert_eq!(metrics.resolution_count(ResolutionPath::Cached), 1);
}

#[tokio::test]
async fn test_server_going_away_is_reported_per_candidate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    let live_port = server.address().port();
    let config = config_for(live_port, closed_port());
    let mut session = Session::from_config(&config, Arc::new(Metrics::new().unwrap())).unwrap();

    session.resolve_connection(false).await.unwrap();

    // Only the first listing is answered; wiremock replies 404 afterwards
    let err = session.resolve_connection(false).await.unwrap_err();

    // Cached endpoint once, then the remaining candidate
    let kinds: Vec<_> = err.attempts().iter().map(|a| a.failure.kind()).collect();
    assert_eq!(kinds, vec!["protocol", "refused"]);
    assert_eq!(err.attempts()[0].endpoint.port(), live_port);
    assert!(err.to_string().starts_with("Could not connect to Ollama"));
    assert_eq!(
        session.cached_endpoint(),
        Some(&Endpoint::new("127.0.0.1", live_port))
    );
}
