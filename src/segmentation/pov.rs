/*!
 * Point-of-view classification by pronoun voting.
 */

use regex::Regex;
use std::sync::LazyLock;

use crate::script::Pov;

static FIRST_PERSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:i|me|my|mine|we|us|our|ours)\b").expect("Invalid first-person regex")
});

static SECOND_PERSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:you|your|yours)\b").expect("Invalid second-person regex"));

static THIRD_PERSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:he|him|his|she|her|hers|it|its|they|them|their|theirs)\b")
        .expect("Invalid third-person regex")
});

/// Classify the grammatical point of view of a text.
///
/// The category with the highest non-zero pronoun count wins; ties prefer
/// first over second over third person. No pronouns gives `Unknown`.
pub fn classify_pov(text: &str) -> Pov {
    let first = FIRST_PERSON.find_iter(text).count();
    let second = SECOND_PERSON.find_iter(text).count();
    let third = THIRD_PERSON.find_iter(text).count();

    if first > 0 && first >= second && first >= third {
        Pov::First
    } else if second > 0 && second >= third {
        Pov::Second
    } else if third > 0 {
        Pov::Third
    } else {
        Pov::Unknown
    }
}
