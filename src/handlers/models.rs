//! Models endpoint handler
//!
//! `GET /models` resolves a connection (cached endpoint first) and returns
//! the classified catalog. `?refresh=true` clears the cache and sweeps
//! every candidate again.

use crate::catalog::ModelCatalog;
use crate::error::AppResult;
use crate::handlers::AppState;
use crate::resolver::ProbeReport;
use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

/// Query parameters for GET /models
#[derive(Debug, Default, Deserialize)]
pub struct ModelsQuery {
    #[serde(default)]
    pub refresh: bool,
}

/// Response for GET /models
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    /// Endpoint the catalog came from
    pub endpoint: String,
    pub from_cache: bool,
    /// Probes that failed before `endpoint` answered
    pub failed_attempts: Vec<ProbeReport>,
    /// Vision-first presentation order
    pub models: ModelCatalog,
    /// Model a UI should pre-select
    pub selected: Option<String>,
    /// True exactly when `models` is empty
    pub no_models: bool,
}

/// GET /models handler
pub async fn handler(
    State(state): State<AppState>,
    Query(query): Query<ModelsQuery>,
) -> AppResult<Json<ModelsResponse>> {
    let mut session = state.session().lock().await;

    let connection = session.resolve_connection(query.refresh).await?;
    let catalog = session.get_model_catalog(&connection).await?;
    drop(session);

    tracing::debug!(
        endpoint = %connection.endpoint(),
        refresh = query.refresh,
        total_models = catalog.len(),
        vision_models = catalog.vision_count(),
        "Served model catalog"
    );

    Ok(Json(ModelsResponse {
        endpoint: connection.endpoint().to_string(),
        from_cache: connection.from_cache(),
        failed_attempts: connection
            .failed_attempts()
            .iter()
            .map(ProbeReport::from)
            .collect(),
        selected: catalog.default_selection().map(|m| m.name().to_string()),
        no_models: catalog.is_empty(),
        models: catalog,
    }))
}
