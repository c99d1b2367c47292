use serde::{Deserialize, Serialize};

/// Options for the synthesis engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisOptions {
    /// Seed for identifier generation; OS-seeded when absent.
    pub seed: Option<u64>,
    /// Sampling temperature requested from the backend.
    pub temperature: f32,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            seed: None,
            temperature: 0.8,
        }
    }
}

/// Summary of one synthesis call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub rows_requested: usize,
    /// Candidate objects parsed from the backend reply.
    pub candidates_received: usize,
    /// Rows backed by a candidate not used before in this call.
    pub unique_rows: usize,
    /// Rows that reused a candidate cyclically.
    pub reused_rows: usize,
    /// Non-identifier cells filled with the placeholder literal.
    pub placeholder_cells: usize,
    /// Absorbed backend failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_failure: Option<String>,
}

impl SynthesisReport {
    pub fn new(rows_requested: usize) -> Self {
        Self {
            rows_requested,
            ..Self::default()
        }
    }
}
