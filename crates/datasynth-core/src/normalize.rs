//! Label normalization for field identifiers.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::OnceLock;

use regex::Regex;

/// Identifier returned when a label normalizes to nothing.
pub const FALLBACK_FIELD_NAME: &str = "field";

const PARENTHETICAL: &str = r"\(.*?\)";
const DISALLOWED: &str = r"[^A-Za-z0-9 ]+";
const WHITESPACE: &str = r"\s+";

/// Turn a free-form label into a `lower_snake_case` field name.
///
/// Parenthetical content is dropped first, then every character that is not
/// an ASCII letter, digit or space. The remainder is lowercased and runs of
/// spaces become a single underscore. An empty result yields `"field"`.
pub fn normalize_field_name(label: &str) -> String {
    let value = parenthetical_re().replace_all(label, "");
    let value = disallowed_re().replace_all(&value, "");
    let value = value.trim().to_lowercase();
    let value = whitespace_re().replace_all(&value, "_").into_owned();

    if value.is_empty() {
        FALLBACK_FIELD_NAME.to_string()
    } else {
        value
    }
}

/// Drop later duplicates while keeping first-seen order.
pub fn dedupe_preserve_order<T, I>(items: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

fn parenthetical_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PARENTHETICAL).expect("parenthetical pattern compiles"))
}

fn disallowed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DISALLOWED).expect("disallowed-character pattern compiles"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(WHITESPACE).expect("whitespace pattern compiles"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_parentheticals_and_punctuation() {
        assert_eq!(normalize_field_name("Area (km2)"), "area");
        assert_eq!(normalize_field_name("GDP (PPP) per capita"), "gdp_per_capita");
        assert_eq!(normalize_field_name("Time-zone"), "timezone");
        assert_eq!(normalize_field_name("  Largest   city "), "largest_city");
    }

    #[test]
    fn falls_back_when_nothing_survives() {
        assert_eq!(normalize_field_name(""), FALLBACK_FIELD_NAME);
        assert_eq!(normalize_field_name("(only this)"), FALLBACK_FIELD_NAME);
        assert_eq!(normalize_field_name("°—€"), FALLBACK_FIELD_NAME);
    }

    #[test]
    fn unbalanced_parenthesis_is_dropped_as_punctuation() {
        assert_eq!(normalize_field_name("Density (per km2"), "density_per_km2");
    }

    #[test]
    fn patterns_compile() {
        for pattern in [PARENTHETICAL, DISALLOWED, WHITESPACE] {
            assert!(Regex::new(pattern).is_ok(), "{pattern} must compile");
        }
        assert!(parenthetical_re().is_match("(x)"));
        assert!(disallowed_re().is_match("-"));
        assert!(whitespace_re().is_match("\t"));
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let labels = vec!["Capital", "Area", "Capital", "Population", "Area"];
        assert_eq!(
            dedupe_preserve_order(labels),
            vec!["Capital", "Area", "Population"]
        );
    }
}
