use datasynth_core::{Dataset, GenerationRequest, SchemaSuggestion};
use schemars::schema_for;

fn main() {
    let contract = serde_json::json!({
        "schema_suggestion": schema_for!(SchemaSuggestion),
        "generation_request": schema_for!(GenerationRequest),
        "dataset": schema_for!(Dataset),
    });
    let json = serde_json::to_string_pretty(&contract).expect("serialize json schema");
    println!("{json}");
}
