use std::collections::HashSet;

use datasynth_core::{Dataset, Field, GenerationRequest, PLACEHOLDER_VALUE, Row};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use crate::backend::{CompletionBackend, CompletionRequest, ResponseFormat};
use crate::candidates::{Candidate, identity_key, parse_candidates, value_to_cell};
use crate::model::{SynthesisOptions, SynthesisReport};
use crate::prompt::build_generation_prompt;

const IDENTIFIER_MIN: u32 = 100_000;
const IDENTIFIER_MAX: u32 = 999_999;

/// Result of a synthesis call.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub dataset: Dataset,
    pub report: SynthesisReport,
}

/// Entry point for synthesizing rows from a generative backend.
pub struct SynthesisEngine<B> {
    backend: B,
    options: SynthesisOptions,
}

impl<B: CompletionBackend> SynthesisEngine<B> {
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, SynthesisOptions::default())
    }

    pub fn with_options(backend: B, options: SynthesisOptions) -> Self {
        Self { backend, options }
    }

    /// Produce exactly `count` rows for `fields`.
    pub fn generate_dataset(
        &self,
        fields: &[Field],
        count: usize,
        description: &str,
        locale: &str,
    ) -> Dataset {
        let request = GenerationRequest {
            fields: fields.to_vec(),
            count,
            description: description.to_string(),
            locale: locale.to_string(),
        };
        self.run(&request).dataset
    }

    /// Produce exactly `request.count` rows plus a report of how they were
    /// sourced. Backend failures degrade to placeholder rows, never errors.
    pub fn run(&self, request: &GenerationRequest) -> SynthesisResult {
        let mut report = SynthesisReport::new(request.count);
        let context_fields: Vec<&str> = request
            .fields
            .iter()
            .filter(|field| !field.is_identifier())
            .map(|field| field.name.as_str())
            .collect();

        info!(
            rows = request.count,
            fields = request.fields.len(),
            context_fields = context_fields.len(),
            locale = %request.locale,
            "synthesis started"
        );

        let candidates = if context_fields.is_empty() {
            Vec::new()
        } else {
            self.fetch_candidates(request, &context_fields, &mut report)
        };
        report.candidates_received = candidates.len();

        let mut rng = match self.options.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        let identity_field = context_fields.first().copied();
        let mut seen_entities = HashSet::new();
        let mut dataset = Vec::with_capacity(request.count);

        for index in 0..request.count {
            let source = select_candidate(
                &candidates,
                identity_field,
                index,
                &mut seen_entities,
                &mut report,
            );
            dataset.push(assemble_row(
                &request.fields,
                source,
                &mut rng,
                &mut report,
            ));
        }

        info!(
            rows = dataset.len(),
            candidates = report.candidates_received,
            unique_rows = report.unique_rows,
            reused_rows = report.reused_rows,
            placeholder_cells = report.placeholder_cells,
            "synthesis finished"
        );
        SynthesisResult { dataset, report }
    }

    fn fetch_candidates(
        &self,
        request: &GenerationRequest,
        context_fields: &[&str],
        report: &mut SynthesisReport,
    ) -> Vec<Candidate> {
        let completion = CompletionRequest {
            prompt: build_generation_prompt(
                &request.description,
                &request.locale,
                request.count,
                context_fields,
            ),
            response_format: ResponseFormat::JsonObject,
            temperature: self.options.temperature,
        };

        let parsed = self
            .backend
            .complete(&completion)
            .and_then(|text| parse_candidates(&text));
        match parsed {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(error = %err, "generative backend unavailable; using placeholder rows");
                report.backend_failure = Some(err.to_string());
                Vec::new()
            }
        }
    }
}

/// Pick the first non-empty candidate whose identity has not been used yet in
/// this call; once novelty is exhausted, cycle through candidates by row index.
fn select_candidate<'a>(
    candidates: &'a [Candidate],
    identity_field: Option<&str>,
    index: usize,
    seen_entities: &mut HashSet<String>,
    report: &mut SynthesisReport,
) -> Option<&'a Candidate> {
    if let Some(fresh) = candidates.iter().find(|candidate| {
        !candidate.is_empty()
            && seen_entities.insert(identity_key(candidate, identity_field, index))
    })
    {
        report.unique_rows += 1;
        return Some(fresh);
    }
    if candidates.is_empty() {
        return None;
    }
    report.reused_rows += 1;
    Some(&candidates[index % candidates.len()])
}

fn assemble_row(
    fields: &[Field],
    source: Option<&Candidate>,
    rng: &mut ChaCha8Rng,
    report: &mut SynthesisReport,
) -> Row {
    let mut row = Row::new();
    for field in fields {
        if field.is_identifier() {
            let id: u32 = rng.random_range(IDENTIFIER_MIN..=IDENTIFIER_MAX);
            row.insert(field.name.as_str(), id.to_string());
            continue;
        }

        let value = source
            .and_then(|candidate| candidate.get(&field.name))
            .and_then(value_to_cell);
        match value {
            Some(value) => row.insert(field.name.as_str(), value),
            None => {
                report.placeholder_cells += 1;
                row.insert(field.name.as_str(), PLACEHOLDER_VALUE);
            }
        }
    }
    row
}
