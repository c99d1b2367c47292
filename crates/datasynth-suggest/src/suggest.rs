//! Schema suggestion: knowledge-base fields first, heuristic templates when
//! the lookup has nothing usable.

use std::collections::HashSet;

use datasynth_core::{Field, SchemaSuggestion, Settings, normalize_field_name};
use tracing::{info, warn};

use crate::fetch::FetchError;
use crate::knowledge::{KnowledgeSource, LookupOutcome, PageCandidates, WikiKnowledgeBase};
use crate::templates::{TemplateCategory, templates_for};

const IDENTIFIER_FIELD: &str = "id";
const IDENTIFIER_LABEL: &str = "Identifier";

/// Suggests a field schema for a dataset description.
///
/// Never fails: every knowledge-base failure is absorbed into a heuristic
/// template, and `global_reasoning` records why.
pub struct SchemaSuggester<K> {
    source: K,
}

impl<K: KnowledgeSource> SchemaSuggester<K> {
    pub fn new(source: K) -> Self {
        Self { source }
    }

    pub fn suggest_schema(&self, description: &str, max_fields: usize) -> SchemaSuggestion {
        let query = description.trim();
        if query.is_empty() {
            return heuristic(
                "generic",
                max_fields,
                "No description provided; used generic template.".to_string(),
            );
        }

        match self.source.lookup(query) {
            Ok(LookupOutcome::Found(page)) if !page.is_partial() => {
                from_page(query, &page, max_fields)
            }
            Ok(LookupOutcome::Found(page)) => {
                info!(query, title = %page.title, "page has no fact box; using heuristic template");
                heuristic(
                    description,
                    max_fields,
                    format!(
                        "Knowledge-base page found: “{}”, but no fact-box attributes detected. \
                         Falling back to heuristic template based on your description.",
                        page.title
                    ),
                )
            }
            Ok(LookupOutcome::NotFound) => {
                info!(query, "no knowledge-base hits; using heuristic template");
                heuristic(
                    description,
                    max_fields,
                    format!("No knowledge-base hits for “{query}”. Used heuristic template."),
                )
            }
            Err(err) => {
                warn!(query, error = %err, transient = err.is_transient(), "knowledge-base lookup failed");
                heuristic(
                    description,
                    max_fields,
                    format!(
                        "Knowledge-base lookup for “{query}” failed ({}). Used heuristic template.",
                        failure_summary(&err)
                    ),
                )
            }
        }
    }
}

/// Suggest a schema using the knowledge base configured in `settings`.
pub fn suggest_schema(settings: &Settings, description: &str, max_fields: usize) -> SchemaSuggestion {
    let source = WikiKnowledgeBase::new(&settings.knowledge_base_url, &settings.user_agent);
    SchemaSuggester::new(source).suggest_schema(description, max_fields)
}

fn heuristic(description: &str, max_fields: usize, reasoning: String) -> SchemaSuggestion {
    let category = TemplateCategory::classify(description);
    let fields = templates_for(description)
        .iter()
        .take(max_fields)
        .map(|(name, desc)| Field::new(*name, *desc))
        .collect();
    info!(?category, "heuristic template selected");
    SchemaSuggestion {
        fields,
        global_reasoning: reasoning,
    }
}

fn from_page(query: &str, page: &PageCandidates, max_fields: usize) -> SchemaSuggestion {
    let mut pairs: Vec<(String, &str)> = page
        .labels
        .iter()
        .map(|label| (normalize_field_name(label), label.as_str()))
        .collect();
    if !pairs.iter().any(|(name, _)| name == IDENTIFIER_FIELD) {
        pairs.insert(0, (IDENTIFIER_FIELD.to_string(), IDENTIFIER_LABEL));
    }

    // Distinct labels can normalize to the same name ("Area (km2)", "Area (mi2)").
    let mut seen = HashSet::new();
    let fields: Vec<Field> = pairs
        .into_iter()
        .filter(|(name, _)| seen.insert(name.clone()))
        .take(max_fields)
        .map(|(name, label)| {
            Field::new(
                name,
                format!("{label} (extracted from the fact box of “{}”)", page.title),
            )
        })
        .collect();

    let mut reasoning = format!(
        "Searched the knowledge base for “{query}” → top page “{}” (approx hits: {}). \
         Extracted {} field(s) from the page's fact box.",
        page.title,
        page.hits,
        fields.len()
    );
    if !page.summary.is_empty() {
        reasoning.push_str(" Summary: ");
        reasoning.push_str(&page.summary);
    }

    info!(query, title = %page.title, fields = fields.len(), "schema suggested from knowledge base");
    SchemaSuggestion {
        fields,
        global_reasoning: reasoning,
    }
}

fn failure_summary(err: &FetchError) -> String {
    match err {
        FetchError::Transient { status: 429, .. } => "rate limited".to_string(),
        FetchError::Transient { status, .. } | FetchError::Permanent { status, .. } => {
            format!("HTTP {status}")
        }
        FetchError::Transport { .. } => "unreachable".to_string(),
        FetchError::Decode { .. } => "unexpected response".to_string(),
        FetchError::InvalidUrl { .. } | FetchError::Client(_) => "client misconfigured".to_string(),
    }
}
