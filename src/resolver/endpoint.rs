//! Candidate endpoint type
//!
//! An endpoint is a `(host, port)` pair naming a place where a local Ollama
//! server might be listening.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Conventional Ollama port
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;

/// A candidate inference server address
///
/// Fields are private so an endpoint cannot change after construction.
/// Config files deserialize into this type directly; `Config::validate()`
/// rejects blank hosts and port 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Create a new endpoint
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Get the host name or address
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the TCP port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL for HTTP requests (no trailing slash)
    ///
    /// IPv6 literals are bracketed so the URL stays parseable.
    pub fn base_url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    /// Build a full URL for an API path such as `/api/tags`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Default candidate list, most likely to succeed first
///
/// Conventional port on `localhost`, the same port on the loopback IP (for
/// hosts where `localhost` resolves to `::1` but the server binds IPv4 only),
/// then the common alternate port.
pub fn default_candidates() -> Vec<Endpoint> {
    vec![
        Endpoint::new("localhost", DEFAULT_OLLAMA_PORT),
        Endpoint::new("127.0.0.1", DEFAULT_OLLAMA_PORT),
        Endpoint::new("localhost", 8080),
    ]
}
