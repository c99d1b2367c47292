/// Instructions sent to the generative backend for one dataset.
///
/// Only non-identifier field names are listed; identifiers are synthesized
/// locally and never requested from the model.
pub fn build_generation_prompt(
    description: &str,
    locale: &str,
    count: usize,
    context_fields: &[&str],
) -> String {
    let fields = context_fields.join(", ");
    format!(
        "Dataset Subject: {description} (Context: {locale})\n\
         Count: Generate exactly {count} rows.\n\
         Fields: {fields}\n\
         \n\
         STRICT RULES:\n\
         1. NO DUPLICATES: Each row must describe a different entity. Return {count} distinct entities, never the same one twice.\n\
         2. VARIETY: Spread values widely across every field.\n\
         3. LANGUAGE: English only.\n\
         4. FORMAT: Return ONLY a JSON object with a \"rows\" key holding a list of objects keyed by exactly these field names: {fields}.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_count_locale_and_fields() {
        let prompt = build_generation_prompt("planets", "en_US", 8, &["name", "mass"]);
        assert!(prompt.contains("Dataset Subject: planets (Context: en_US)"));
        assert!(prompt.contains("Generate exactly 8 rows."));
        assert!(prompt.contains("Fields: name, mass"));
        assert!(prompt.contains("\"rows\""));
    }
}
