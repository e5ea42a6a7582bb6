//! Model catalog
//!
//! Lists the models installed on a resolved endpoint, classifies each one
//! and orders them vision-first. Catalogs are never cached or edited in
//! place; every refresh builds a new one.

pub mod classifier;

pub use classifier::{Capability, FamilyRule, MatchKind, VisionTable};

use crate::resolver::{ProbeFailure, ResolvedConnection};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// The endpoint answered, but its listing could not be used
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Failed to list models on {endpoint}: {reason}")]
    Unreachable {
        endpoint: String,
        reason: ProbeFailure,
    },

    #[error("Unparseable model listing from {endpoint}: {reason}")]
    Malformed { endpoint: String, reason: String },
}

/// A discovered model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDescriptor {
    name: String,
    capability: Capability,
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>, table: &VisionTable) -> Self {
        let name = name.into();
        let capability = table.classify(&name);
        Self { name, capability }
    }

    /// Model name including tag, exactly as the server reported it
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn is_vision_capable(&self) -> bool {
        self.capability == Capability::Vision
    }
}

/// Classified models, vision-capable first, alphabetical within each group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModelCatalog {
    models: Vec<ModelDescriptor>,
}

impl ModelCatalog {
    /// Classify and order a set of names
    ///
    /// The result depends only on the input names, not their order.
    pub fn from_names<I, S>(names: I, table: &VisionTable) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut models: Vec<ModelDescriptor> = names
            .into_iter()
            .map(|name| ModelDescriptor::new(name, table))
            .collect();

        models.sort_by(|a, b| {
            b.is_vision_capable()
                .cmp(&a.is_vision_capable())
                .then_with(|| a.name.cmp(&b.name))
        });

        Self { models }
    }

    /// True when the server has no models installed
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ModelDescriptor> {
        self.models.iter()
    }

    /// Names in presentation order
    pub fn names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name()).collect()
    }

    pub fn vision_count(&self) -> usize {
        self.models.iter().filter(|m| m.is_vision_capable()).count()
    }

    /// Model to pre-select: the first vision model, else the first model
    ///
    /// Because vision models sort first, this is simply the head of the list.
    pub fn default_selection(&self) -> Option<&ModelDescriptor> {
        self.models.first()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.iter().any(|m| m.name == name)
    }
}

impl<'a> IntoIterator for &'a ModelCatalog {
    type Item = &'a ModelDescriptor;
    type IntoIter = std::slice::Iter<'a, ModelDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.iter()
    }
}

/// Extract model names from a raw listing payload
///
/// Accepts `{"models": [...]}` or a bare array. Entries may be strings or
/// objects carrying `name` (preferred) or `model`; entries with neither are
/// skipped. A mapping without `models` is an empty listing.
///
/// # Errors
///
/// The reason string when `models` is not an array or the payload is
/// neither an object nor an array.
pub fn parse_listing(payload: &Value) -> Result<Vec<String>, String> {
    let entries = match payload {
        Value::Array(entries) => entries,
        Value::Object(map) => match map.get("models") {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(entries)) => entries,
            Some(other) => {
                return Err(format!(
                    "\"models\" must be an array, got {}",
                    json_type(other)
                ));
            }
        },
        other => {
            return Err(format!(
                "expected an object or array, got {}",
                json_type(other)
            ));
        }
    };

    let mut names = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry_name(entry) {
            Some(name) => names.push(name.to_string()),
            None => tracing::warn!(entry = %entry, "Skipping listing entry without a model name"),
        }
    }
    Ok(names)
}

fn entry_name(entry: &Value) -> Option<&str> {
    let name = match entry {
        Value::String(name) => Some(name.as_str()),
        Value::Object(map) => map
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.trim().is_empty())
            .or_else(|| map.get("model").and_then(Value::as_str)),
        _ => None,
    }?;
    let name = name.trim();
    (!name.is_empty()).then_some(name)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Query a resolved endpoint and build a fresh catalog
///
/// An empty listing yields an empty catalog, not an error.
///
/// # Errors
///
/// - [`CatalogError::Unreachable`] when the listing request times out or is refused
/// - [`CatalogError::Malformed`] when the reply is not a usable listing
pub async fn list_models(
    connection: &ResolvedConnection,
    table: &VisionTable,
) -> Result<ModelCatalog, CatalogError> {
    let endpoint = connection.endpoint();

    let payload = connection
        .backend()
        .list(endpoint)
        .await
        .map_err(|failure| match failure {
            ProbeFailure::Protocol(reason) => CatalogError::Malformed {
                endpoint: endpoint.to_string(),
                reason,
            },
            other => CatalogError::Unreachable {
                endpoint: endpoint.to_string(),
                reason: other,
            },
        })?;

    let names = parse_listing(&payload).map_err(|reason| CatalogError::Malformed {
        endpoint: endpoint.to_string(),
        reason,
    })?;

    let catalog = ModelCatalog::from_names(names, table);

    if catalog.is_empty() {
        tracing::warn!(endpoint = %endpoint, "No models found");
    } else {
        tracing::info!(
            endpoint = %endpoint,
            total = catalog.len(),
            vision = catalog.vision_count(),
            "Model catalog loaded"
        );
    }

    Ok(catalog)
}
