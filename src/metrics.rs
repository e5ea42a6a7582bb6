//! Prometheus metrics collection
//!
//! Tracks:
//! - Probe outcomes per candidate endpoint
//! - How each resolution was satisfied (cache hit, sweep, failure)
//! - Size of the last catalog by capability
//! - Analysis outcomes
//!
//! Metrics are exposed via the bridge's `/metrics` endpoint in Prometheus
//! text format.

use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// How a resolution request was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPath {
    /// The cached endpoint answered its probe
    Cached,
    /// A candidate sweep found a live endpoint
    Sweep,
    /// Every probe failed
    Failed,
}

impl ResolutionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionPath::Cached => "cached",
            ResolutionPath::Sweep => "sweep",
            ResolutionPath::Failed => "failed",
        }
    }
}

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    probes_total: IntCounterVec,
    resolutions_total: IntCounterVec,
    catalog_models: IntGaugeVec,
    analyses_total: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance with its own registry
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: candidates × 4 outcomes, bounded by the configured list
        let probes_total = IntCounterVec::new(
            Opts::new(
                "vision_analyzer_probes_total",
                "Liveness probes by endpoint and outcome (success, timeout, refused, protocol)",
            ),
            &["endpoint", "outcome"],
        )?;

        let resolutions_total = IntCounterVec::new(
            Opts::new(
                "vision_analyzer_resolutions_total",
                "Endpoint resolutions by path (cached, sweep, failed)",
            ),
            &["path"],
        )?;

        let catalog_models = IntGaugeVec::new(
            Opts::new(
                "vision_analyzer_catalog_models",
                "Models in the most recent catalog by capability",
            ),
            &["capability"],
        )?;

        let analyses_total = IntCounterVec::new(
            Opts::new(
                "vision_analyzer_analyses_total",
                "Image analyses by outcome (success or error kind)",
            ),
            &["outcome"],
        )?;

        registry.register(Box::new(probes_total.clone()))?;
        registry.register(Box::new(resolutions_total.clone()))?;
        registry.register(Box::new(catalog_models.clone()))?;
        registry.register(Box::new(analyses_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            probes_total,
            resolutions_total,
            catalog_models,
            analyses_total,
        })
    }

    /// Record a single probe
    ///
    /// `outcome` is `"success"` or a `ProbeFailure::kind()` label.
    pub fn record_probe(&self, endpoint: &str, outcome: &str) -> Result<(), prometheus::Error> {
        self.probes_total
            .get_metric_with_label_values(&[endpoint, outcome])?
            .inc();
        Ok(())
    }

    pub fn record_resolution(&self, path: ResolutionPath) -> Result<(), prometheus::Error> {
        self.resolutions_total
            .get_metric_with_label_values(&[path.as_str()])?
            .inc();
        Ok(())
    }

    /// Overwrite the catalog size gauges
    pub fn record_catalog(&self, vision: usize, text: usize) -> Result<(), prometheus::Error> {
        self.catalog_models
            .get_metric_with_label_values(&["vision"])?
            .set(vision as i64);
        self.catalog_models
            .get_metric_with_label_values(&["text"])?
            .set(text as i64);
        Ok(())
    }

    pub fn record_analysis(&self, outcome: &str) -> Result<(), prometheus::Error> {
        self.analyses_total
            .get_metric_with_label_values(&[outcome])?
            .inc();
        Ok(())
    }

    /// Probe count for one endpoint and outcome (0 if never recorded)
    ///
    /// Reads the gathered registry, so asking never creates a series.
    pub fn probe_count(&self, endpoint: &str, outcome: &str) -> u64 {
        self.counter_value(
            "vision_analyzer_probes_total",
            &[("endpoint", endpoint), ("outcome", outcome)],
        )
    }

    pub fn resolution_count(&self, path: ResolutionPath) -> u64 {
        self.counter_value("vision_analyzer_resolutions_total", &[("path", path.as_str())])
    }

    /// Value of the counter series matching every label pair, or 0
    fn counter_value(&self, family: &str, labels: &[(&str, &str)]) -> u64 {
        self.registry
            .gather()
            .iter()
            .find(|mf| mf.name() == family)
            .and_then(|mf| {
                mf.get_metric().iter().find(|m| {
                    labels.iter().all(|(name, value)| {
                        m.get_label()
                            .iter()
                            .any(|l| l.name() == *name && l.value() == *value)
                    })
                })
            })
            .map(|m| m.get_counter().value.unwrap_or(0.0) as u64)
            .unwrap_or(0)
    }

    /// Encode all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!("metrics output is not valid UTF-8: {}", e))
        })
    }
}

/// Log and swallow a metrics recording failure
///
/// Metrics must never turn a working resolution into a failed one.
pub(crate) fn log_recording_failure(operation: &str, result: Result<(), prometheus::Error>) {
    if let Err(e) = result {
        tracing::warn!(operation = operation, error = %e, "Failed to record metric");
    }
}
