//! Telemetry and observability setup
//!
//! Configures structured logging with tracing and tracing-subscriber.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Initialize tracing subscriber for structured logging
///
/// Only the first call per process installs a subscriber; later calls do
/// nothing. `RUST_LOG` wins over `default_level` when set.
///
/// Logs go to stderr so `vision-analyzer analyze` output on stdout can be
/// piped cleanly.
///
/// # Examples
///
/// ```no_run
/// vision_analyzer::telemetry::init("info");
/// tracing::info!("Application started");
/// ```
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "vision_analyzer={},tower_http=debug",
                default_level
            ))
        });

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    });
}
