/*!
 * Abbreviation expansion.
 *
 * Titles like `Dr.` end in a period that the sentence splitter would treat
 * as a sentence end, and TTS engines read them poorly. They are expanded to
 * their spoken form before segmentation.
 */

use regex::{NoExpand, Regex};
use std::sync::LazyLock;

use super::patterns::ABBREVIATIONS;

/// Compiled `(pattern, replacement)` pairs in table order.
static ABBREVIATION_RULES: LazyLock<Vec<(Regex, String)>> = LazyLock::new(|| {
    ABBREVIATIONS
        .iter()
        .map(|(abbr, expansion)| {
            let body = abbr
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+");
            let pattern = format!(r"(?i)\b{}\s", body);
            let regex = Regex::new(&pattern).expect("Invalid abbreviation regex");
            (regex, format!("{} ", expansion))
        })
        .collect()
});

/// Expand known abbreviations, case-insensitively and anchored at word starts.
///
/// Each abbreviation must be followed by whitespace, which is replaced by a
/// single space.
pub fn expand_abbreviations(text: &str) -> String {
    let mut expanded = text.to_string();
    for (regex, replacement) in ABBREVIATION_RULES.iter() {
        if regex.is_match(&expanded) {
            expanded = regex.replace_all(&expanded, NoExpand(replacement)).into_owned();
        }
    }
    expanded
}
