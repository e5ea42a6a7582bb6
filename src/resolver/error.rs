//! Probe failure classification and the resolver's error type

use super::endpoint::Endpoint;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Why a single request to an endpoint failed
///
/// Used for liveness probes and for listing requests. The variants map onto
/// what a user can act on: nothing answered in time, nothing is listening,
/// or something answered that is not an Ollama server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("connection refused: {0}")]
    Refused(String),

    #[error("protocol mismatch: {0}")]
    Protocol(String),
}

impl ProbeFailure {
    /// Short stable label for metrics and JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Refused(_) => "refused",
            Self::Protocol(_) => "protocol",
        }
    }

    /// Classify a reqwest transport error
    pub fn from_reqwest(error: &reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout { after: timeout }
        } else if error.is_connect() {
            Self::Refused(error.to_string())
        } else {
            Self::Protocol(error.to_string())
        }
    }
}

/// A failed probe against one endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeAttempt {
    pub endpoint: Endpoint,
    pub failure: ProbeFailure,
}

impl fmt::Display for ProbeAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.endpoint, self.failure)
    }
}

/// Serializable view of a probe attempt for the HTTP bridge
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub endpoint: String,
    pub kind: &'static str,
    pub reason: String,
}

impl From<&ProbeAttempt> for ProbeReport {
    fn from(attempt: &ProbeAttempt) -> Self {
        Self {
            endpoint: attempt.endpoint.to_string(),
            kind: attempt.failure.kind(),
            reason: attempt.failure.to_string(),
        }
    }
}

/// No candidate endpoint accepted a probe
///
/// Carries every attempt in the order it was made, so the caller can show
/// exactly which addresses were tried and why each one failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionError {
    attempts: Vec<ProbeAttempt>,
}

impl ConnectionError {
    pub fn new(attempts: Vec<ProbeAttempt>) -> Self {
        Self { attempts }
    }

    /// All failed attempts, in the order they were made
    pub fn attempts(&self) -> &[ProbeAttempt] {
        &self.attempts
    }

    pub fn reports(&self) -> Vec<ProbeReport> {
        self.attempts.iter().map(ProbeReport::from).collect()
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attempts.is_empty() {
            return write!(f, "Could not connect to Ollama: no candidate endpoints configured");
        }
        write!(
            f,
            "Could not connect to Ollama after {} attempt(s): ",
            self.attempts.len()
        )?;
        for (i, attempt) in self.attempts.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", attempt)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConnectionError {}
