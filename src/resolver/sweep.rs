//! Endpoint resolution
//!
//! Finds a reachable inference server by probing the cached endpoint first
//! and then sweeping the candidate list in priority order.
//!
//! Probes run one after another. The usual case answers on the first or
//! second candidate, and each probe is bounded by the backend's timeout.

use super::cache::EndpointCache;
use super::connection::ResolvedConnection;
use super::endpoint::Endpoint;
use super::error::{ConnectionError, ProbeAttempt, ProbeFailure};
use crate::backend::InferenceBackend;
use crate::metrics::{Metrics, ResolutionPath, log_recording_failure};
use std::sync::Arc;

/// Resolves a live endpoint and owns the endpoint cache
///
/// Methods that can change the cache take `&mut self`, so callers that share
/// a resolver must serialize refreshes themselves (the HTTP bridge keeps it
/// behind a mutex).
pub struct EndpointResolver {
    candidates: Vec<Endpoint>,
    backend: Arc<dyn InferenceBackend>,
    cache: EndpointCache,
    metrics: Arc<Metrics>,
}

impl EndpointResolver {
    pub fn new(
        candidates: Vec<Endpoint>,
        backend: Arc<dyn InferenceBackend>,
        metrics: Arc<Metrics>,
    ) -> Self {
        tracing::debug!(
            candidates = candidates.len(),
            "EndpointResolver initialized with empty cache"
        );
        Self {
            candidates,
            backend,
            cache: EndpointCache::new(),
            metrics,
        }
    }

    /// Candidate endpoints in priority order
    pub fn candidates(&self) -> &[Endpoint] {
        &self.candidates
    }

    /// The endpoint that answered last, if any
    pub fn cached_endpoint(&self) -> Option<&Endpoint> {
        self.cache.current()
    }

    /// Clear the cached endpoint; the next resolution sweeps from the top
    pub fn reset(&mut self) {
        self.cache.reset();
    }

    /// Resolve for a front-end refresh
    ///
    /// `force_refresh` clears the cache first. Otherwise the cached endpoint
    /// (if any) is tried before the sweep.
    pub async fn resolve_connection(
        &mut self,
        force_refresh: bool,
    ) -> Result<ResolvedConnection, ConnectionError> {
        if force_refresh {
            tracing::info!("Forced refresh requested; clearing cached endpoint");
            self.reset();
        }
        let preferred = self.cache.current().cloned();
        self.resolve(preferred).await
    }

    /// Find a live endpoint
    ///
    /// A `preferred` endpoint is probed first and returned on success without
    /// touching the candidate list. Otherwise every candidate is probed in
    /// order and the first to answer wins. A preferred endpoint that already
    /// failed is not probed again during the sweep, so a hanging server costs
    /// one probe timeout, not two. Success updates the cache; failure leaves
    /// it as it was.
    ///
    /// # Errors
    ///
    /// [`ConnectionError`] with one attempt per probe issued, in order, when
    /// nothing answered. Each endpoint appears once.
    pub async fn resolve(
        &mut self,
        preferred: Option<Endpoint>,
    ) -> Result<ResolvedConnection, ConnectionError> {
        let mut failures = Vec::new();
        let mut already_failed = None;

        if let Some(endpoint) = preferred {
            match self.probe(&endpoint).await {
                Ok(()) => {
                    tracing::info!(endpoint = %endpoint, "Reconnected to cached endpoint");
                    log_recording_failure(
                        "record_resolution",
                        self.metrics.record_resolution(ResolutionPath::Cached),
                    );
                    self.cache.remember(endpoint.clone());
                    return Ok(ResolvedConnection::new(
                        endpoint,
                        self.backend.clone(),
                        true,
                        failures,
                    ));
                }
                Err(failure) => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        error = %failure,
                        "Cached endpoint did not answer, sweeping all candidates"
                    );
                    already_failed = Some(endpoint.clone());
                    failures.push(ProbeAttempt { endpoint, failure });
                }
            }
        }

        for endpoint in &self.candidates {
            if already_failed.as_ref() == Some(endpoint) {
                tracing::debug!(endpoint = %endpoint, "Skipping cached endpoint, already failed");
                continue;
            }
            match self.probe(endpoint).await {
                Ok(()) => {
                    tracing::info!(
                        endpoint = %endpoint,
                        failed_probes = failures.len(),
                        "Connected to Ollama"
                    );
                    log_recording_failure(
                        "record_resolution",
                        self.metrics.record_resolution(ResolutionPath::Sweep),
                    );
                    self.cache.remember(endpoint.clone());
                    return Ok(ResolvedConnection::new(
                        endpoint.clone(),
                        self.backend.clone(),
                        false,
                        failures,
                    ));
                }
                Err(failure) => {
                    failures.push(ProbeAttempt {
                        endpoint: endpoint.clone(),
                        failure,
                    });
                }
            }
        }

        tracing::warn!(
            attempts = failures.len(),
            "No candidate endpoint answered; is `ollama serve` running?"
        );
        log_recording_failure(
            "record_resolution",
            self.metrics.record_resolution(ResolutionPath::Failed),
        );
        Err(ConnectionError::new(failures))
    }

    /// Issue one liveness probe
    async fn probe(&self, endpoint: &Endpoint) -> Result<(), ProbeFailure> {
        let result = self.backend.list(endpoint).await;
        let label = endpoint.to_string();

        match &result {
            Ok(_) => {
                tracing::debug!(endpoint = %endpoint, "Probe succeeded");
                log_recording_failure("record_probe", self.metrics.record_probe(&label, "success"));
            }
            Err(failure) => {
                tracing::debug!(
                    endpoint = %endpoint,
                    kind = failure.kind(),
                    error = %failure,
                    "Probe failed"
                );
                log_recording_failure(
                    "record_probe",
                    self.metrics.record_probe(&label, failure.kind()),
                );
            }
        }

        result.map(|_| ())
    }
}
