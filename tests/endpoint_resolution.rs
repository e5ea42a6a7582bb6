//! Integration tests for endpoint resolution
//!
//! Drives `Session` against a scripted backend so probe counts and ordering
//! can be asserted without any network I/O.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use vision_analyzer::analysis::{AnalysisError, AnalysisRequest};
use vision_analyzer::backend::InferenceBackend;
use vision_analyzer::catalog::VisionTable;
use vision_analyzer::metrics::{Metrics, ResolutionPath};
use vision_analyzer::resolver::{Endpoint, ProbeFailure};
use vision_analyzer::session::Session;

/// Backend whose live endpoints can be changed between resolutions
struct ScriptedBackend {
    live: Mutex<HashSet<Endpoint>>,
    probes: Mutex<Vec<Endpoint>>,
}

impl ScriptedBackend {
    fn new(live: &[Endpoint]) -> Arc<Self> {
        Arc::new(Self {
            live: Mutex::new(live.iter().cloned().collect()),
            probes: Mutex::new(Vec::new()),
        })
    }

    fn set_live(&self, live: &[Endpoint]) {
        *self.live.lock().unwrap() = live.iter().cloned().collect();
    }

    fn take_probes(&self) -> Vec<Endpoint> {
        std::mem::take(&mut *self.probes.lock().unwrap())
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn list(&self, endpoint: &Endpoint) -> Result<serde_json::Value, ProbeFailure> {
        self.probes.lock().unwrap().push(endpoint.clone());
        if self.live.lock().unwrap().contains(endpoint) {
            Ok(json!({ "models": [] }))
        } else {
            Err(ProbeFailure::Refused(format!("nothing listening on {}", endpoint)))
        }
    }

    async fn generate(
        &self,
        _endpoint: &Endpoint,
        _request: &AnalysisRequest,
    ) -> Result<String, AnalysisError> {
        Ok(String::new())
    }
}

fn candidates() -> Vec<Endpoint> {
    vec![
        Endpoint::new("localhost", 11434),
        Endpoint::new("127.0.0.1", 11434),
        Endpoint::new("localhost", 8080),
    ]
}

fn session_with(backend: Arc<ScriptedBackend>) -> (Session, Arc<Metrics>) {
    let metrics = Arc::new(Metrics::new().expect("should create metrics"));
    let session = Session::new(
        candidates(),
        VisionTable::builtin(),
        backend,
        metrics.clone(),
    );
    (session, metrics)
}

#[tokio::test]
async fn test_first_candidate_answers_with_one_probe() {
    let backend = ScriptedBackend::new(&[candidates()[0].clone()]);
    let (mut session, metrics) = session_with(backend.clone());

    let connection = session.resolve_connection(false).await.unwrap();

    assert_eq!(connection.endpoint(), &candidates()[0]);
    assert_eq!(connection.probe_count(), 1);
    assert!(connection.failed_attempts().is_empty());
    assert_eq!(backend.take_probes(), vec![candidates()[0].clone()]);
    assert_eq!(metrics.resolution_count(ResolutionPath::Sweep), 1);
}

#[tokio::test]
async fn test_kth_candidate_answers_after_k_probes() {
    let backend = ScriptedBackend::new(&[candidates()[2].clone()]);
    let (mut session, _) = session_with(backend.clone());

    let connection = session.resolve_connection(false).await.unwrap();

    assert_eq!(connection.endpoint(), &candidates()[2]);
    assert!(!connection.from_cache());
    assert_eq!(connection.probe_count(), 3);
    let failed: Vec<_> = connection
        .failed_attempts()
        .iter()
        .map(|a| a.endpoint.clone())
        .collect();
    assert_eq!(failed, candidates()[..2].to_vec());
    assert_eq!(backend.take_probes(), candidates());
}

#[tokio::test]
async fn test_all_candidates_down_reports_each_in_order() {
    let backend = ScriptedBackend::new(&[]);
    let (mut session, metrics) = session_with(backend);

    let err = session.resolve_connection(false).await.unwrap_err();

    let tried: Vec<_> = err.attempts().iter().map(|a| a.endpoint.clone()).collect();
    assert_eq!(tried, candidates());
    assert!(
        err.attempts()
            .iter()
            .all(|a| matches!(a.failure, ProbeFailure::Refused(_)))
    );

    let message = err.to_string();
    assert!(message.contains("3 attempt(s)"), "got: {}", message);
    assert!(message.contains("localhost:11434"));
    assert!(message.contains("localhost:8080"));
    assert_eq!(metrics.resolution_count(ResolutionPath::Failed), 1);
}

#[tokio::test]
async fn test_cached_endpoint_reconnects_with_one_probe() {
    let backend = ScriptedBackend::new(&[candidates()[1].clone()]);
    let (mut session, metrics) = session_with(backend.clone());

    session.resolve_connection(false).await.unwrap();
    backend.take_probes();

    let connection = session.resolve_connection(false).await.unwrap();

    assert!(connection.from_cache());
    assert_eq!(connection.endpoint(), &candidates()[1]);
    assert_eq!(backend.take_probes(), vec![candidates()[1].clone()]);
    assert_eq!(metrics.resolution_count(ResolutionPath::Cached), 1);
}

#[tokio::test]
async fn test_reset_restarts_sweep_from_first_candidate() {
    let backend = ScriptedBackend::new(&[candidates()[1].clone()]);
    let (mut session, _) = session_with(backend.clone());

    session.resolve_connection(false).await.unwrap();
    session.reset();
    assert!(session.cached_endpoint().is_none());

    // A higher-priority server came up meanwhile
    backend.set_live(&[candidates()[0].clone(), candidates()[1].clone()]);
    backend.take_probes();

    let connection = session.resolve_connection(false).await.unwrap();

    assert_eq!(connection.endpoint(), &candidates()[0]);
    assert_eq!(backend.take_probes(), vec![candidates()[0].clone()]);
}

#[tokio::test]
async fn test_forced_refresh_ignores_cache() {
    let backend = ScriptedBackend::new(&[candidates()[1].clone()]);
    let (mut session, _) = session_with(backend.clone());

    session.resolve_connection(false).await.unwrap();
    backend.take_probes();

    let connection = session.resolve_connection(true).await.unwrap();

    assert!(!connection.from_cache());
    assert_eq!(backend.take_probes(), candidates()[..2].to_vec());
}

#[tokio::test]
async fn test_dead_cache_falls_back_to_sweep() {
    let backend = ScriptedBackend::new(&[candidates()[1].clone()]);
    let (mut session, _) = session_with(backend.clone());

    session.resolve_connection(false).await.unwrap();
    backend.set_live(&[candidates()[2].clone()]);
    backend.take_probes();

    let connection = session.resolve_connection(false).await.unwrap();

    assert_eq!(connection.endpoint(), &candidates()[2]);
    assert!(!connection.from_cache());
    // Cached attempt first, then the sweep without the endpoint that just failed
    assert_eq!(
        backend.take_probes(),
        vec![
            candidates()[1].clone(),
            candidates()[0].clone(),
            candidates()[2].clone(),
        ]
    );
    assert_eq!(connection.failed_attempts().len(), 2);
    assert_eq!(session.cached_endpoint(), Some(&candidates()[2]));
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_cache() {
    let backend = ScriptedBackend::new(&[candidates()[0].clone()]);
    let (mut session, _) = session_with(backend.clone());

    session.resolve_connection(false).await.unwrap();
    backend.set_live(&[]);
    backend.take_probes();

    let err = session.resolve_connection(false).await.unwrap_err();

    // Every candidate is tried exactly once, the cached one first
    assert_eq!(backend.take_probes(), candidates());
    assert_eq!(err.attempts().len(), candidates().len());
    assert_eq!(session.cached_endpoint(), Some(&candidates()[0]));
}
