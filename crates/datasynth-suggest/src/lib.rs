//! Schema suggestion pipeline for Datasynth.
//!
//! A description is looked up against an encyclopedic knowledge base (action
//! API first, REST API as fallback); attribute labels from the matched page's
//! fact box become fields. When the lookup fails or the page carries no fact
//! box, a keyword-selected heuristic template is used instead.

pub mod factbox;
pub mod fetch;
pub mod knowledge;
pub mod suggest;
pub mod templates;

pub use factbox::extract_factbox_labels;
pub use fetch::{FetchClient, FetchError, RetryPolicy};
pub use knowledge::{KnowledgeSource, LookupOutcome, PageCandidates, WikiKnowledgeBase};
pub use suggest::{SchemaSuggester, suggest_schema};
pub use templates::{FieldPairs, TemplateCategory, templates_for};
