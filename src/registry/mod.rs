//! Report endpoint registry
//!
//! The registry maps a report key (e.g. `sales`) to its display name, URL template
//! and the shape of the query parameters it expects. It is built once from data,
//! never mutated, and shared read-only between concurrent fetch tasks.

use crate::DateRange;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

/// Embedded registry data
const REGISTRY_JSON: &str = include_str!("endpoints.json");

/// Placeholder substituted with the API base URL
pub const BASE_URL_PLACEHOLDER: &str = "{base_url}";

/// Global registry instance (loaded once)
static REGISTRY: Lazy<Result<Arc<EndpointRegistry>, RegistryError>> =
    Lazy::new(|| EndpointRegistry::from_json(REGISTRY_JSON).map(Arc::new));

/// Query parameter layout of an endpoint.
///
/// Each variant maps to a fixed builder over the requested [`DateRange`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ParamShape {
    /// No query parameters
    None,
    /// `dateFrom` as an RFC3339 timestamp
    Since,
    /// `dateFrom` and `dateTo` as `YYYY-MM-DD`
    DateOnly,
    /// `dateFrom` and `dateTo` as RFC3339 timestamps
    Timestamps,
    /// `date` set to the last day of the range
    ReportDay,
    /// `dateFrom`/`dateTo` as `YYYY-MM-DD` plus a fixed `nmId` article filter
    DateWithNmId {
        /// Article (nomenclature) id sent as `nmId`
        nm_id: u64,
    },
}

impl ParamShape {
    /// Build the shape-generated parameters for a range.
    pub fn build(&self, range: &DateRange) -> Vec<(String, String)> {
        let pair = |k: &str, v: String| (k.to_string(), v);
        match self {
            ParamShape::None => Vec::new(),
            ParamShape::Since => vec![pair("dateFrom", range.from_rfc3339())],
            ParamShape::DateOnly => vec![
                pair("dateFrom", range.from_date()),
                pair("dateTo", range.to_date()),
            ],
            ParamShape::Timestamps => vec![
                pair("dateFrom", range.from_rfc3339()),
                pair("dateTo", range.to_rfc3339()),
            ],
            ParamShape::ReportDay => vec![pair("date", range.to_date())],
            ParamShape::DateWithNmId { nm_id } => vec![
                pair("dateFrom", range.from_date()),
                pair("dateTo", range.to_date()),
                pair("nmId", nm_id.to_string()),
            ],
        }
    }

    /// Short name used in listings.
    pub fn name(&self) -> &'static str {
        match self {
            ParamShape::None => "none",
            ParamShape::Since => "since",
            ParamShape::DateOnly => "date_only",
            ParamShape::Timestamps => "timestamps",
            ParamShape::ReportDay => "report_day",
            ParamShape::DateWithNmId { .. } => "date_with_nm_id",
        }
    }
}

/// A single report endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDefinition {
    key: String,
    display_name: String,
    url_template: String,
    params: ParamShape,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    static_params: BTreeMap<String, String>,
}

impl EndpointDefinition {
    /// Create a definition without static parameters
    pub fn new(
        key: impl Into<String>,
        display_name: impl Into<String>,
        url_template: impl Into<String>,
        params: ParamShape,
    ) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            url_template: url_template.into(),
            params,
            static_params: BTreeMap::new(),
        }
    }

    /// Add a fixed query parameter sent on every request
    pub fn with_static_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.static_params.insert(name.into(), value.into());
        self
    }

    /// Get the report key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the human-readable name
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Get the URL template
    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    /// Get the parameter shape
    pub fn param_shape(&self) -> &ParamShape {
        &self.params
    }

    /// Get the fixed query parameters
    pub fn static_params(&self) -> &BTreeMap<String, String> {
        &self.static_params
    }

    /// Resolve the URL template against a base URL
    pub fn url(&self, base_url: &str) -> String {
        self.url_template
            .replace(BASE_URL_PLACEHOLDER, base_url.trim_end_matches('/'))
    }

    /// Build the full query for a range.
    ///
    /// Shape-generated parameters come first; a static parameter with the same
    /// name as a generated one is skipped.
    pub fn build_query(&self, range: &DateRange) -> Vec<(String, String)> {
        let mut query = self.params.build(range);
        for (name, value) in &self.static_params {
            if !query.iter().any(|(existing, _)| existing == name) {
                query.push((name.clone(), value.clone()));
            }
        }
        query
    }
}

/// Registry of report endpoints, in registration order
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    schema_version: String,
    endpoints: Vec<EndpointDefinition>,
    index: HashMap<String, usize>,
}

impl EndpointRegistry {
    /// Load the embedded registry
    ///
    /// The registry is parsed once per process; every call returns a handle to the
    /// same instance.
    pub fn load() -> Result<Arc<Self>, RegistryError> {
        (*REGISTRY).clone()
    }

    /// Parse a registry from JSON
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let raw: RawRegistry = serde_json::from_str(json)
            .map_err(|e| RegistryError::ParseError(format!("Failed to parse registry: {e}")))?;

        let mut registry = Self::from_definitions(raw.endpoints)?;
        registry.schema_version = raw.schema_version;
        Ok(registry)
    }

    /// Load a registry from a JSON file with the embedded schema
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            RegistryError::ParseError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Build a registry from definitions, keeping their order
    pub fn from_definitions(endpoints: Vec<EndpointDefinition>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(endpoints.len());
        for (position, endpoint) in endpoints.iter().enumerate() {
            if endpoint.key.is_empty() {
                return Err(RegistryError::ParseError(
                    "Endpoint key cannot be empty".to_string(),
                ));
            }
            if index.insert(endpoint.key.clone(), position).is_some() {
                return Err(RegistryError::DuplicateKey(endpoint.key.clone()));
            }
        }

        Ok(Self {
            schema_version: String::from("1.0"),
            endpoints,
            index,
        })
    }

    /// Get the registry schema version
    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Look up an endpoint by report key
    pub fn lookup(&self, key: &str) -> Result<&EndpointDefinition, RegistryError> {
        self.index
            .get(key)
            .map(|&position| &self.endpoints[position])
            .ok_or_else(|| RegistryError::UnknownEndpoint(key.to_string()))
    }

    /// Whether a key is registered
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// All report keys in registration order
    pub fn all_keys(&self) -> Vec<&str> {
        self.endpoints.iter().map(|e| e.key.as_str()).collect()
    }

    /// All endpoints in registration order
    pub fn entries(&self) -> &[EndpointDefinition] {
        &self.endpoints
    }

    /// Number of registered endpoints
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Raw registry structure for deserialization
#[derive(Debug, Deserialize)]
struct RawRegistry {
    schema_version: String,
    #[allow(dead_code)]
    last_updated: String,
    endpoints: Vec<EndpointDefinition>,
}

/// Errors that can occur when working with the registry
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    /// Failed to parse registry data
    #[error("registry parse error: {0}")]
    ParseError(String),

    /// Two endpoints share a key
    #[error("duplicate endpoint key: {0}")]
    DuplicateKey(String),

    /// Report key not registered
    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),
}
