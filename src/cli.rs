//! Command-line interface
//!
//! Provides argument parsing and subcommand handling for the
//! `vision-analyzer` binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Analyze images with vision models on a local Ollama server
#[derive(Parser)]
#[command(name = "vision-analyzer")]
#[command(version)]
#[command(about = "Analyze images with vision models on a local Ollama server")]
#[command(
    long_about = "vision-analyzer finds a running Ollama server among a list of candidate \
    endpoints, lists its models with vision-capable ones first, and runs image analyses. \
    Without a subcommand it serves a local JSON bridge for desktop front-ends."
)]
pub struct Cli {
    /// Path to configuration file (defaults to ./config.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List installed models, vision-capable first
    ///
    /// Every run sweeps the candidates from the top; only the long-running
    /// bridge keeps an endpoint cache (`GET /models?refresh=true`).
    Models,
    /// Analyze an image with a model
    Analyze {
        /// Image file (JPG, PNG, GIF, BMP, TIFF)
        #[arg(short, long)]
        image: PathBuf,
        /// Prompt to send with the image
        #[arg(short, long)]
        prompt: Option<String>,
        /// Model to use (defaults to the first vision model)
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Serve the local HTTP bridge
    Serve,
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Troubleshooting checklist printed after a failed connection
pub const TROUBLESHOOTING: &str = "Troubleshooting:
  1. Make sure 'ollama serve' is running
  2. Try restarting Ollama
  3. Check if another app is using port 11434
  4. Try running: ollama list (in a terminal)";

/// Guidance printed when the server has no models
pub const INSTALL_GUIDANCE: &str = "No models found in Ollama.

Install a model with:
  ollama pull llava:7b
  ollama pull qwen2.5vl:7b
  ollama pull moondream";

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# vision-analyzer Configuration
# ==============================
#
# Every section is optional. Values shown are the built-in defaults.

# ─────────────────────────────────────────────────────────────────────────────
# CANDIDATE ENDPOINTS
# ─────────────────────────────────────────────────────────────────────────────
#
# Probed in order until one answers GET /api/tags. The endpoint that answers
# is remembered by the bridge and tried first on its next refresh.

[[endpoints]]
host = "localhost"
port = 11434

[[endpoints]]
host = "127.0.0.1"
port = 11434

[[endpoints]]
host = "localhost"
port = 8080

# ─────────────────────────────────────────────────────────────────────────────
# TIMEOUTS
# ─────────────────────────────────────────────────────────────────────────────

[probe]
# Per-candidate probe timeout in seconds (1-30)
timeout_seconds = 3

[generation]
# Analysis timeout in seconds (1-600); cold models can take a while to load
timeout_seconds = 120

# ─────────────────────────────────────────────────────────────────────────────
# VISION CLASSIFICATION
# ─────────────────────────────────────────────────────────────────────────────
#
# Extra rules evaluated before the built-in table. First match wins.
#   token:      lowercase family token
#   match:      "prefix" (family starts with token) or
#               "segment" (a '-' or '_' separated part equals token)
#   capability: "vision" or "text"
#
# [[catalog.rules]]
# token = "gemma3"
# match = "prefix"
# capability = "vision"

# ─────────────────────────────────────────────────────────────────────────────
# LOCAL HTTP BRIDGE
# ─────────────────────────────────────────────────────────────────────────────

[server]
host = "127.0.0.1"
port = 3100

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"
"#
}
