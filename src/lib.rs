//! vision-analyzer - image analysis front-end core for local Ollama servers
//!
//! Finds a reachable Ollama endpoint among prioritized candidates, caches it
//! for fast reconnection, lists installed models with vision-capable ones
//! first, and passes image analyses through to the selected model.

pub mod analysis;
pub mod backend;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod resolver;
pub mod session;
pub mod telemetry;
