//! Endpoint discovery
//!
//! Finds which candidate Ollama endpoint is reachable and remembers it so
//! later refreshes can skip the sweep.

pub mod cache;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod sweep;

pub use cache::EndpointCache;
pub use connection::ResolvedConnection;
pub use endpoint::{DEFAULT_OLLAMA_PORT, Endpoint, default_candidates};
pub use error::{ConnectionError, ProbeAttempt, ProbeFailure, ProbeReport};
pub use sweep::EndpointResolver;
