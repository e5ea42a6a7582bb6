//! Front-end session
//!
//! The surface a UI talks to: resolve a connection, list the catalog for
//! it, and forget the cached endpoint on a manual refresh. A session owns
//! its resolver and classification table; nothing here is global.

use crate::analysis::{self, AnalysisError, AnalysisRequest};
use crate::backend::{InferenceBackend, OllamaClient};
use crate::catalog::{self, CatalogError, ModelCatalog, VisionTable};
use crate::config::Config;
use crate::error::AppResult;
use crate::metrics::{Metrics, log_recording_failure};
use crate::resolver::{ConnectionError, Endpoint, EndpointResolver, ResolvedConnection};
use std::sync::Arc;

pub struct Session {
    resolver: EndpointResolver,
    table: VisionTable,
    metrics: Arc<Metrics>,
}

impl Session {
    /// Build a session around any backend
    pub fn new(
        candidates: Vec<Endpoint>,
        table: VisionTable,
        backend: Arc<dyn InferenceBackend>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            resolver: EndpointResolver::new(candidates, backend, metrics.clone()),
            table,
            metrics,
        }
    }

    /// Build a session talking to Ollama over HTTP with configured timeouts
    pub fn from_config(config: &Config, metrics: Arc<Metrics>) -> AppResult<Self> {
        let backend = OllamaClient::new(config.probe_timeout(), config.generation_timeout())?;
        Ok(Self::new(
            config.endpoints.clone(),
            config.vision_table(),
            Arc::new(backend),
            metrics,
        ))
    }

    /// Get a ready connection
    ///
    /// `force_refresh` discards the cached endpoint and sweeps from the
    /// first candidate; otherwise the cached endpoint is tried first.
    pub async fn resolve_connection(
        &mut self,
        force_refresh: bool,
    ) -> Result<ResolvedConnection, ConnectionError> {
        self.resolver.resolve_connection(force_refresh).await
    }

    /// List and classify the models on a resolved endpoint
    pub async fn get_model_catalog(
        &self,
        connection: &ResolvedConnection,
    ) -> Result<ModelCatalog, CatalogError> {
        let catalog = catalog::list_models(connection, &self.table).await?;
        log_recording_failure(
            "record_catalog",
            self.metrics.record_catalog(
                catalog.vision_count(),
                catalog.len() - catalog.vision_count(),
            ),
        );
        Ok(catalog)
    }

    /// Run an analysis and record its outcome
    ///
    /// Callers holding the session behind a lock should clone the metrics
    /// handle and call [`analyze_recorded`] after releasing it instead.
    pub async fn analyze(
        &self,
        connection: &ResolvedConnection,
        request: &AnalysisRequest,
    ) -> Result<String, AnalysisError> {
        analyze_recorded(&self.metrics, connection, request).await
    }

    /// Forget the cached endpoint
    pub fn reset(&mut self) {
        self.resolver.reset();
    }

    pub fn cached_endpoint(&self) -> Option<&Endpoint> {
        self.resolver.cached_endpoint()
    }

    pub fn candidates(&self) -> &[Endpoint] {
        self.resolver.candidates()
    }

    pub fn vision_table(&self) -> &VisionTable {
        &self.table
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

/// [`analysis::analyze`] plus an outcome counter
pub async fn analyze_recorded(
    metrics: &Metrics,
    connection: &ResolvedConnection,
    request: &AnalysisRequest,
) -> Result<String, AnalysisError> {
    let result = analysis::analyze(connection, request).await;
    let outcome = match &result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    log_recording_failure("record_analysis", metrics.record_analysis(outcome));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_uses_configured_candidates() {
        let config = Config::default();
        let metrics = Arc::new(Metrics::new().expect("should create metrics"));
        let session = Session::from_config(&config, metrics).expect("should build session");

        assert_eq!(session.candidates(), config.endpoints.as_slice());
        assert!(session.cached_endpoint().is_none());
        assert!(session.vision_table().is_vision("llava:7b"));
    }
}
