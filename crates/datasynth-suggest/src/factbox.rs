//! Fact-box label extraction from rendered page markup.
//!
//! This is a best-effort heuristic rather than a semantic reading of the
//! page: it takes the first table whose class mentions `infobox` and returns
//! its header-cell texts. Pages that lay out attributes differently, or
//! unusual markup, can make it under- or over-extract.

use datasynth_core::dedupe_preserve_order;
use scraper::{ElementRef, Html, Selector};

const FACTBOX_CLASS: &str = "infobox";
const MAX_LABEL_CHARS: usize = 40;
const NAVIGATIONAL_PREFIX: &str = "part of";

/// Collect attribute labels from the first fact box in `markup`.
///
/// Labels are returned as displayed text (tags stripped, entities decoded),
/// trimmed, with long or navigational labels removed and duplicates
/// collapsed in first-seen order. Returns an empty list when no fact box is
/// present.
pub fn extract_factbox_labels(markup: &str) -> Vec<String> {
    let (Ok(tables), Ok(headers)) = (Selector::parse("table"), Selector::parse("th")) else {
        return Vec::new();
    };

    let document = Html::parse_document(markup);
    let Some(factbox) = document.select(&tables).find(is_factbox) else {
        return Vec::new();
    };

    let labels = factbox
        .select(&headers)
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .filter(|label| is_attribute_label(label));

    dedupe_preserve_order(labels)
}

fn is_factbox(table: &ElementRef<'_>) -> bool {
    table
        .value()
        .attr("class")
        .is_some_and(|class| class.to_ascii_lowercase().contains(FACTBOX_CLASS))
}

fn is_attribute_label(label: &str) -> bool {
    !label.is_empty()
        && label.chars().count() <= MAX_LABEL_CHARS
        && !label.to_lowercase().starts_with(NAVIGATIONAL_PREFIX)
}
