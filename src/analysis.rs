//! Image analysis requests
//!
//! Validates what the user picked (model, prompt, image) and hands it to the
//! backend's `generate` call. Backend failures are propagated unchanged so a
//! front-end can tell a timeout from an unknown model or a rejected image.

use crate::resolver::{Endpoint, ProbeFailure, ResolvedConnection};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Prompt pre-filled by the front-ends
pub const DEFAULT_PROMPT: &str = "Describe what you see in this image.";

/// File extensions accepted as image attachments (lowercase, no dot)
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff"];

/// Errors from validating or running an analysis
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid analysis request: {0}")]
    Validation(String),

    #[error("Unsupported image file '{}': expected one of JPG, PNG, GIF, BMP, TIFF", path.display())]
    UnsupportedImage { path: PathBuf },

    #[error("Failed to read image '{}': {source}", path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Generation request to {endpoint} timed out after {after:?}")]
    Timeout { endpoint: String, after: Duration },

    #[error("Model '{model}' is not installed on {endpoint}")]
    UnknownModel { endpoint: String, model: String },

    #[error("The model rejected the image: {0}")]
    MalformedImage(String),

    #[error("Could not reach {endpoint}: {reason}")]
    Unreachable {
        endpoint: String,
        reason: ProbeFailure,
    },

    #[error("Ollama returned HTTP {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Unexpected response from {endpoint}: {reason}")]
    Protocol { endpoint: String, reason: String },
}

impl AnalysisError {
    /// Short stable label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::UnsupportedImage { .. } => "unsupported_image",
            Self::ImageRead { .. } => "image_read",
            Self::Timeout { .. } => "timeout",
            Self::UnknownModel { .. } => "unknown_model",
            Self::MalformedImage(_) => "malformed_image",
            Self::Unreachable { .. } => "unreachable",
            Self::Backend { .. } => "backend",
            Self::Protocol { .. } => "protocol",
        }
    }

    /// Classify a reqwest transport error from a generation call
    pub fn from_reqwest(endpoint: &Endpoint, error: &reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                endpoint: endpoint.to_string(),
                after: timeout,
            }
        } else if error.is_connect() {
            Self::Unreachable {
                endpoint: endpoint.to_string(),
                reason: ProbeFailure::Refused(error.to_string()),
            }
        } else {
            Self::Protocol {
                endpoint: endpoint.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

/// An image to send along with the prompt
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    label: String,
    bytes: Vec<u8>,
}

impl ImageAttachment {
    /// Load an image file, checking its extension first
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        if !is_supported_image(path) {
            return Err(AnalysisError::UnsupportedImage {
                path: path.to_path_buf(),
            });
        }

        let bytes = std::fs::read(path).map_err(|source| AnalysisError::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;

        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::from_bytes(label, bytes)
    }

    /// Wrap image bytes received from a front-end
    pub fn from_bytes(label: impl Into<String>, bytes: Vec<u8>) -> Result<Self, AnalysisError> {
        if bytes.is_empty() {
            return Err(AnalysisError::Validation("image is empty".to_string()));
        }
        Ok(Self {
            label: label.into(),
            bytes,
        })
    }

    /// Display name (file name for images loaded from disk)
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Standard base64 encoding, as `/api/generate` expects in `images`
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// Check a path's extension against [`SUPPORTED_IMAGE_EXTENSIONS`]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// A validated analysis request
///
/// Model and prompt are stored trimmed. Construction through [`Self::new`]
/// is the only way to get one, so the backend never sees a blank field.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    model: String,
    prompt: String,
    image: ImageAttachment,
}

impl AnalysisRequest {
    pub fn new(
        model: impl AsRef<str>,
        prompt: impl AsRef<str>,
        image: ImageAttachment,
    ) -> Result<Self, AnalysisError> {
        let model = model.as_ref().trim();
        if model.is_empty() {
            return Err(AnalysisError::Validation(
                "no model selected; pick a vision model first".to_string(),
            ));
        }

        let prompt = prompt.as_ref().trim();
        if prompt.is_empty() {
            return Err(AnalysisError::Validation(
                "prompt cannot be empty or contain only whitespace".to_string(),
            ));
        }

        Ok(Self {
            model: model.to_string(),
            prompt: prompt.to_string(),
            image,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn image(&self) -> &ImageAttachment {
        &self.image
    }
}

/// Run an analysis against a resolved connection
///
/// A straight pass-through to the backend; nothing is retried and the cached
/// endpoint is left alone when the call fails.
pub async fn analyze(
    connection: &ResolvedConnection,
    request: &AnalysisRequest,
) -> Result<String, AnalysisError> {
    tracing::info!(
        endpoint = %connection.endpoint(),
        model = %request.model(),
        image = %request.image().label(),
        image_bytes = request.image().bytes().len(),
        "Submitting image analysis"
    );

    let result = connection
        .backend()
        .generate(connection.endpoint(), request)
        .await;

    match &result {
        Ok(text) => tracing::info!(
            endpoint = %connection.endpoint(),
            model = %request.model(),
            response_chars = text.chars().count(),
            "Analysis complete"
        ),
        Err(e) => tracing::warn!(
            endpoint = %connection.endpoint(),
            model = %request.model(),
            error = %e,
            "Analysis failed"
        ),
    }

    result
}
