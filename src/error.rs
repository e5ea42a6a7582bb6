//! Error types
//!
//! Each component has its own error enum; [`AppError`] gathers them for the
//! front-ends and implements `IntoResponse` for the HTTP bridge.

use crate::analysis::AnalysisError;
use crate::catalog::CatalogError;
use crate::resolver::ConnectionError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file '{path}': {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status the bridge answers with
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Catalog(_) => StatusCode::BAD_GATEWAY,
            Self::Analysis(e) => match e {
                AnalysisError::Validation(_)
                | AnalysisError::UnsupportedImage { .. }
                | AnalysisError::MalformedImage(_) => StatusCode::BAD_REQUEST,
                AnalysisError::UnknownModel { .. } => StatusCode::NOT_FOUND,
                AnalysisError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                AnalysisError::Unreachable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                AnalysisError::Backend { .. } | AnalysisError::Protocol { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                AnalysisError::ImageRead { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = serde_json::json!({
            "error": self.to_string(),
        });

        // Per-candidate reasons so a UI can show what was tried
        if let Self::Connection(e) = &self {
            body["attempts"] = serde_json::json!(e.reports());
        }

        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
