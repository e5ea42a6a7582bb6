//! Handle to a live endpoint

use super::endpoint::Endpoint;
use super::error::ProbeAttempt;
use crate::backend::InferenceBackend;
use std::fmt;
use std::sync::Arc;

/// The currently trusted endpoint plus the backend used to reach it
///
/// Cheap to clone: front-ends hand clones to background tasks for catalog
/// listing and analysis while the resolver keeps its cache.
#[derive(Clone)]
pub struct ResolvedConnection {
    endpoint: Endpoint,
    backend: Arc<dyn InferenceBackend>,
    from_cache: bool,
    failed_attempts: Vec<ProbeAttempt>,
}

impl ResolvedConnection {
    pub(crate) fn new(
        endpoint: Endpoint,
        backend: Arc<dyn InferenceBackend>,
        from_cache: bool,
        failed_attempts: Vec<ProbeAttempt>,
    ) -> Self {
        Self {
            endpoint,
            backend,
            from_cache,
            failed_attempts,
        }
    }

    /// The endpoint that answered
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn backend(&self) -> &Arc<dyn InferenceBackend> {
        &self.backend
    }

    /// True when the cached endpoint answered and no sweep was needed
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    /// Probes that failed before this endpoint answered, in order
    pub fn failed_attempts(&self) -> &[ProbeAttempt] {
        &self.failed_attempts
    }

    /// Total probes issued for this resolution, including the successful one
    pub fn probe_count(&self) -> usize {
        self.failed_attempts.len() + 1
    }
}

impl fmt::Debug for ResolvedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConnection")
            .field("endpoint", &self.endpoint)
            .field("from_cache", &self.from_cache)
            .field("failed_attempts", &self.failed_attempts)
            .finish_non_exhaustive()
    }
}
