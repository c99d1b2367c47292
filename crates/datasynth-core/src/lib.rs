//! Core contracts and helpers for Datasynth.
//!
//! This crate defines the field/row data model shared by the schema
//! suggestion and row synthesis pipelines, the process-wide settings value,
//! and the text normalizer used to turn free-form labels into field names.

pub mod config;
pub mod error;
pub mod model;
pub mod normalize;

pub use config::{ConfigError, Settings};
pub use error::{CoreError, Result};
pub use model::{Dataset, Field, GenerationRequest, Row, SchemaSuggestion};
pub use normalize::{FALLBACK_FIELD_NAME, dedupe_preserve_order, normalize_field_name};

/// Literal written into a row cell when no candidate supplies a value.
pub const PLACEHOLDER_VALUE: &str = "Unique Data Required";
