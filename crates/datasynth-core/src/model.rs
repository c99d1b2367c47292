use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// A single column of the requested dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Field {
    /// Column identifier (`lower_snake_case` when produced by the normalizer).
    pub name: String,
    /// Human-readable description of the column.
    #[serde(default)]
    pub description: String,
    /// Whether the value should come from the generative backend.
    #[serde(rename = "useAI", default = "default_use_ai")]
    pub use_ai: bool,
}

fn default_use_ai() -> bool {
    true
}

impl Field {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            use_ai: true,
        }
    }

    /// Identifier columns are always synthesized locally.
    ///
    /// Any name containing `id` (case-insensitive) qualifies, which also
    /// catches names such as `width` or `valid_from`.
    pub fn is_identifier(&self) -> bool {
        is_identifier_name(&self.name)
    }
}

/// Returns true when `name` contains `id`, ignoring case.
pub fn is_identifier_name(name: &str) -> bool {
    name.to_ascii_lowercase().contains("id")
}

/// Suggested schema plus a provenance explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SchemaSuggestion {
    pub fields: Vec<Field>,
    /// Always non-empty; explains where the fields came from.
    pub global_reasoning: String,
}

/// Input to the row synthesis pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationRequest {
    pub fields: Vec<Field>,
    /// Exact number of rows to produce.
    pub count: usize,
    pub description: String,
    /// Locale hint forwarded to the generative backend (e.g. `hi_IN`).
    pub locale: String,
}

impl GenerationRequest {
    /// Boundary-side validation; the synthesis engine assumes it has passed.
    pub fn validate(&self, max_rows: usize) -> Result<()> {
        if self.count == 0 {
            return Err(CoreError::InvalidRequest(
                "row count must be positive".to_string(),
            ));
        }
        if self.count > max_rows {
            return Err(CoreError::InvalidRequest(format!(
                "row count {} exceeds the configured maximum of {max_rows}",
                self.count
            )));
        }
        if self.fields.is_empty() {
            return Err(CoreError::InvalidRequest(
                "at least one field is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            let name = field.name.trim();
            if name.is_empty() {
                return Err(CoreError::InvalidRequest(
                    "field names must not be empty".to_string(),
                ));
            }
            if !seen.insert(name) {
                return Err(CoreError::InvalidRequest(format!(
                    "duplicate field name '{name}'"
                )));
            }
        }
        Ok(())
    }
}

/// One synthesized record; keys keep the request's field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Row {
    values: Map<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), Value::String(value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates `(field name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str().unwrap_or_default()))
    }
}

/// Ordered output of one generation call.
pub type Dataset = Vec<Row>;
