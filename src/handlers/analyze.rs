//! Analyze endpoint handler
//!
//! Handles `POST /analyze` with a base64 image and optional model/prompt.

use crate::analysis::{AnalysisRequest, DEFAULT_PROMPT, ImageAttachment};
use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::RequestId;
use crate::session::analyze_recorded;
use axum::{Extension, Json, extract::State};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Analysis request body
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeBody {
    /// Model to use; defaults to the catalog's pre-selected model
    #[serde(default)]
    pub model: Option<String>,
    /// Prompt; defaults to [`DEFAULT_PROMPT`]
    #[serde(default)]
    pub prompt: Option<String>,
    /// Image bytes, standard base64, optionally as a `data:` URL
    pub image_base64: String,
    /// Display name for logs
    #[serde(default)]
    pub image_name: Option<String>,
}

/// Analysis response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub endpoint: String,
    pub model: String,
    pub response: String,
}

/// Decode the image payload, accepting `data:image/...;base64,` prefixes
fn decode_image(encoded: &str) -> AppResult<Vec<u8>> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::Validation(format!("image_base64 is not valid base64: {}", e)))
}

/// POST /analyze handler
///
/// Uses the cached endpoint (or sweeps if there is none). The session lock
/// is released before generation starts so `/models` and `/health` stay
/// responsive during long analyses.
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<AnalyzeBody>,
) -> AppResult<Json<AnalyzeResponse>> {
    let bytes = decode_image(&body.image_base64)?;
    let image = ImageAttachment::from_bytes(
        body.image_name.unwrap_or_else(|| "upload".to_string()),
        bytes,
    )?;

    let (connection, model) = {
        let mut session = state.session().lock().await;
        let connection = session.resolve_connection(false).await?;

        let model = match body.model.filter(|m| !m.trim().is_empty()) {
            Some(model) => model,
            None => {
                let catalog = session.get_model_catalog(&connection).await?;
                catalog
                    .default_selection()
                    .map(|m| m.name().to_string())
                    .ok_or_else(|| {
                        AppError::Validation(
                            "No models found. Install one with `ollama pull llava:7b` \
                            or `ollama pull moondream`."
                                .to_string(),
                        )
                    })?
            }
        };
        (connection, model)
    };

    let prompt = body.prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string());
    let request = AnalysisRequest::new(&model, &prompt, image)?;

    tracing::info!(
        request_id = %request_id,
        endpoint = %connection.endpoint(),
        model = %request.model(),
        "Analyzing image"
    );

    let response = analyze_recorded(state.metrics(), &connection, &request).await?;

    Ok(Json(AnalyzeResponse {
        endpoint: connection.endpoint().to_string(),
        model: request.model().to_string(),
        response,
    }))
}
