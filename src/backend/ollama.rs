//! Ollama HTTP client
//!
//! Speaks Ollama's native API: `GET /api/tags` for listings and
//! `POST /api/generate` for single-shot image analysis.

use super::InferenceBackend;
use crate::analysis::{AnalysisError, AnalysisRequest};
use crate::error::{AppError, AppResult};
use crate::resolver::{Endpoint, ProbeFailure};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// Listing path, also used as the liveness probe
pub const TAGS_PATH: &str = "/api/tags";

/// Generation path
pub const GENERATE_PATH: &str = "/api/generate";

/// Non-streaming `/api/generate` reply (only the field we use)
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Error body Ollama sends with non-2xx replies
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// reqwest-backed [`InferenceBackend`]
///
/// One pooled `reqwest::Client` is shared by every request; timeouts are
/// applied per request so probes stay short while generation may take
/// minutes on a cold model.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    probe_timeout: Duration,
    generate_timeout: Duration,
}

impl OllamaClient {
    pub fn new(probe_timeout: Duration, generate_timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            probe_timeout,
            generate_timeout,
        })
    }

    /// Per-request timeout for listings and probes
    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Per-request timeout for generation
    pub fn generate_timeout(&self) -> Duration {
        self.generate_timeout
    }
}

/// Pull a readable message out of an error reply
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// Whether an error message is about the attached image
fn mentions_image(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("image") || lower.contains("decode")
}

#[async_trait]
impl InferenceBackend for OllamaClient {
    async fn list(&self, endpoint: &Endpoint) -> Result<serde_json::Value, ProbeFailure> {
        let url = endpoint.url(TAGS_PATH);

        let response = self
            .http
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| ProbeFailure::from_reqwest(&e, self.probe_timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeFailure::Protocol(format!("HTTP {} from {}", status, url)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProbeFailure::from_reqwest(&e, self.probe_timeout))?;

        serde_json::from_str(&body)
            .map_err(|e| ProbeFailure::Protocol(format!("{} did not return JSON: {}", url, e)))
    }

    async fn generate(
        &self,
        endpoint: &Endpoint,
        request: &AnalysisRequest,
    ) -> Result<String, AnalysisError> {
        let url = endpoint.url(GENERATE_PATH);
        let body = serde_json::json!({
            "model": request.model(),
            "prompt": request.prompt(),
            "images": [request.image().to_base64()],
            "stream": false,
        });

        let response = self
            .http
            .post(&url)
            .timeout(self.generate_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::from_reqwest(endpoint, &e, self.generate_timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AnalysisError::from_reqwest(endpoint, &e, self.generate_timeout))?;

        if status == StatusCode::NOT_FOUND {
            tracing::debug!(
                endpoint = %endpoint,
                model = %request.model(),
                message = %error_message(&text),
                "Generation rejected: model not installed"
            );
            return Err(AnalysisError::UnknownModel {
                endpoint: endpoint.to_string(),
                model: request.model().to_string(),
            });
        }

        if !status.is_success() {
            let message = error_message(&text);
            if (status == StatusCode::BAD_REQUEST || status.is_server_error())
                && mentions_image(&message)
            {
                return Err(AnalysisError::MalformedImage(message));
            }
            return Err(AnalysisError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| AnalysisError::Protocol {
                endpoint: endpoint.to_string(),
                reason: format!("unexpected /api/generate reply: {}", e),
            })?;

        Ok(parsed.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_json_error_field() {
        assert_eq!(
            error_message(r#"{"error":"model 'x' not found"}"#),
            "model 'x' not found"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_raw_text() {
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(error_message(""), "empty response body");
    }

    #[test]
    fn test_mentions_image() {
        assert!(mentions_image("illegal base64 data in Image"));
        assert!(mentions_image("failed to decode input"));
        assert!(!mentions_image("out of memory"));
    }

    #[test]
    fn test_client_keeps_timeouts() {
        let client = OllamaClient::new(Duration::from_secs(3), Duration::from_secs(120))
            .expect("should build client");
        assert_eq!(client.probe_timeout(), Duration::from_secs(3));
        assert_eq!(client.generate_timeout(), Duration::from_secs(120));
    }
}
