//! Row synthesis engine for Datasynth.
//!
//! Candidate rows come from a generative text backend; the engine enforces
//! per-row uniqueness, synthesizes identifier columns locally, and always
//! returns exactly the requested number of complete rows, degrading to
//! placeholder values when the backend fails.

pub mod backend;
pub mod candidates;
pub mod engine;
pub mod errors;
pub mod model;
pub mod output;
pub mod prompt;

pub use backend::{ChatCompletionsBackend, CompletionBackend, CompletionRequest, ResponseFormat};
pub use engine::{SynthesisEngine, SynthesisResult};
pub use errors::{BackendError, OutputError};
pub use model::{SynthesisOptions, SynthesisReport};
