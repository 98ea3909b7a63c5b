/*!
 * Speaker tag extraction.
 *
 * A speaker tag is the short attribution that follows a quotation:
 * `"Run!" shouted Gandalf.` or `"No," Frodo said.` The tag is matched at the
 * start of the text following the closing quote, in either name-verb or
 * verb-name order.
 */

use regex::Regex;
use std::sync::LazyLock;

use super::patterns::{alternation, is_pronoun, PRONOUNS, REPORTING_VERBS};

/// Tag directly after a closing quote.
///
/// `pre` captures a name before the verb, `post` a name after it. The
/// alternation guarantees that at most one of them participates.
static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let verbs = alternation(REPORTING_VERBS);
    let pronouns = alternation(PRONOUNS);
    let name = format!(
        r"(?:(?i:{pronouns})\b|\p{{Lu}}[\p{{L}}\-]*(?:[ \t]+\p{{Lu}}[\p{{L}}\-]*){{0,2}})"
    );
    let pattern = format!(
        r"^[ \t]*,?[ \t]*(?:(?P<pre>{name})[ \t]+(?i:{verbs})\b|(?i:{verbs})[ \t]+(?P<post>{name})\b)[ \t]*[.,;:!?]?"
    );
    Regex::new(&pattern).expect("Invalid speaker tag regex")
});

/// A speaker tag found after a quotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerTag {
    /// Byte length of the tag within the text it was matched against
    pub len: usize,
    /// Tag text without surrounding whitespace or leading comma
    pub text: String,
    /// Comma between the closing quote and the tag, which belongs to the quotation
    pub leading_comma: bool,
    /// Raw name capture, if any
    pub name: Option<String>,
}

impl SpeakerTag {
    /// Speaker name to use, or `None` when the tag only names a pronoun.
    pub fn speaker(&self) -> Option<String> {
        self.name
            .as_deref()
            .filter(|name| !is_pronoun(name))
            .map(title_case)
    }
}

/// Match a speaker tag at the start of `following`.
pub fn extract_tag(following: &str) -> Option<SpeakerTag> {
    let caps = TAG_REGEX.captures(following)?;
    let whole = caps.get(0)?;
    let name = caps
        .name("pre")
        .or_else(|| caps.name("post"))
        .map(|m| m.as_str().trim().to_string())
        .filter(|n| !n.is_empty());

    let trimmed = whole.as_str().trim();
    let text = trimmed.strip_prefix(',').unwrap_or(trimmed).trim_start().to_string();

    Some(SpeakerTag {
        len: whole.end(),
        leading_comma: trimmed.starts_with(','),
        text,
        name,
    })
}

/// Title-case a name: the first letter of every alphabetic run is upper-cased,
/// the rest lower-cased (`o'neil` becomes `O'Neil`).
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                result.extend(c.to_uppercase());
            } else {
                result.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            result.push(c);
            at_word_start = true;
        }
    }
    result
}
