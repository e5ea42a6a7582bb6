//! vision-analyzer binary
//!
//! Lists models, runs one-shot analyses, or serves the local HTTP bridge.

use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use vision_analyzer::{
    analysis::{AnalysisRequest, DEFAULT_PROMPT, ImageAttachment},
    cli::{Cli, Command, INSTALL_GUIDANCE, TROUBLESHOOTING, generate_config_template},
    config::Config,
    error::AppError,
    handlers::{self, AppState},
    metrics::Metrics,
    session::Session,
    telemetry,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // The template command works without a readable config
    if let Some(Command::Config { output }) = &cli.command {
        return write_template(output.as_deref());
    }

    let config = Config::discover(cli.config.as_deref())?;
    telemetry::init(&config.observability.log_level);

    let result = match cli.command {
        Some(Command::Models) => list_models(&config).await,
        Some(Command::Analyze {
            image,
            prompt,
            model,
        }) => analyze(&config, &image, prompt, model).await,
        Some(Command::Serve) | None => serve(config).await,
        Some(Command::Config { .. }) => Ok(()),
    };

    if let Err(AppError::Connection(_)) = &result {
        eprintln!("{}", TROUBLESHOOTING);
    }
    result.map_err(Into::into)
}

fn write_template(output: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let template = generate_config_template();
    match output {
        Some(path) => {
            std::fs::write(path, template)?;
            println!("Configuration template written to: {}", path);
        }
        None => print!("{}", template),
    }
    Ok(())
}

fn new_session(config: &Config) -> Result<Session, AppError> {
    let metrics = Metrics::new()
        .map_err(|e| AppError::Internal(format!("Failed to initialize metrics: {}", e)))?;
    Session::from_config(config, Arc::new(metrics))
}

async fn list_models(config: &Config) -> Result<(), AppError> {
    let mut session = new_session(config)?;
    let connection = session.resolve_connection(false).await?;
    let catalog = session.get_model_catalog(&connection).await?;

    println!("Connected to Ollama at {}", connection.endpoint());
    for attempt in connection.failed_attempts() {
        println!("  (skipped {})", attempt);
    }

    if catalog.is_empty() {
        println!("{}", INSTALL_GUIDANCE);
        return Ok(());
    }

    let selected = catalog.default_selection().map(|m| m.name());
    for model in &catalog {
        let marker = if Some(model.name()) == selected { "*" } else { " " };
        let tag = if model.is_vision_capable() {
            "[vision]"
        } else {
            "[text]  "
        };
        println!("{} {} {}", marker, tag, model.name());
    }
    println!(
        "{} model(s), {} vision-capable",
        catalog.len(),
        catalog.vision_count()
    );
    if catalog.vision_count() == 0 {
        println!("No vision models installed. Try: ollama pull llava:7b");
    }
    Ok(())
}

async fn analyze(
    config: &Config,
    image: &Path,
    prompt: Option<String>,
    model: Option<String>,
) -> Result<(), AppError> {
    let attachment = ImageAttachment::from_path(image)?;
    let mut session = new_session(config)?;
    let connection = session.resolve_connection(false).await?;

    let model = match model {
        Some(model) => model,
        None => {
            let catalog = session.get_model_catalog(&connection).await?;
            match catalog.default_selection() {
                Some(selected) => selected.name().to_string(),
                None => {
                    println!("{}", INSTALL_GUIDANCE);
                    return Err(AppError::Validation("no models installed".to_string()));
                }
            }
        }
    };

    if !session.vision_table().is_vision(&model) {
        tracing::warn!(model = %model, "Model is not recognized as vision-capable");
    }

    let prompt = prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string());
    let request = AnalysisRequest::new(&model, &prompt, attachment)?;

    eprintln!("Analyzing {} with {}...", image.display(), request.model());
    let response = session.analyze(&connection, &request).await?;
    println!("{}", response);
    Ok(())
}

async fn serve(config: Config) -> Result<(), AppError> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let state = AppState::new(Arc::new(config))?;

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind {}:{}: {}", host, port, e)))?;

    tracing::info!("Serving vision-analyzer bridge on {}:{}", host, port);
    tracing::info!("Health check available at http://{}:{}/health", host, port);

    axum::serve(listener, handlers::app(state))
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {}", e)))
}
