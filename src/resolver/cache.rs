//! Single-slot cache of the last endpoint that answered a probe

use super::endpoint::Endpoint;

/// Remembers the endpoint of the last successful resolution
///
/// Lives as long as its owning resolver; nothing is written to disk. The
/// slot only changes on a successful resolution or an explicit [`reset`].
///
/// [`reset`]: EndpointCache::reset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointCache {
    current: Option<Endpoint>,
}

impl EndpointCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached endpoint, if any
    pub fn current(&self) -> Option<&Endpoint> {
        self.current.as_ref()
    }

    /// Replace the cached endpoint
    pub fn remember(&mut self, endpoint: Endpoint) {
        if self.current.as_ref() != Some(&endpoint) {
            tracing::debug!(
                previous = ?self.current.as_ref().map(ToString::to_string),
                endpoint = %endpoint,
                "Caching resolved endpoint"
            );
        }
        self.current = Some(endpoint);
    }

    /// Forget the cached endpoint so the next resolution sweeps from the top
    pub fn reset(&mut self) {
        if let Some(previous) = self.current.take() {
            tracing::debug!(previous = %previous, "Endpoint cache cleared");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}
