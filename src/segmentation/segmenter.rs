/*!
 * Rules-based segmentation of raw prose into script lines.
 *
 * The segmenter expands abbreviations, locates quoted dialogue for every
 * known quote style, attributes speakers from inline tags, splits the
 * narration in between into sentences and chapter headings, and labels each
 * line with its point of view. Output order is reading order.
 */

use anyhow::{anyhow, Result};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::sync::LazyLock;

use crate::script::{Line, AMBIGUOUS, GENERIC_SPEAKER};

use super::abbreviations::expand_abbreviations;
use super::patterns::{
    alternation, QuoteStyle, HEADING_KEYWORDS, HEADING_NUMBER_WORDS, MAX_HEADING_WORDS,
    MIN_FRAGMENT_CHARS, QUOTE_STYLES, STANDALONE_HEADINGS,
};
use super::pov::classify_pov;
use super::speaker_tag::{extract_tag, SpeakerTag};

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r]*\n").expect("Invalid blank line regex"));

/// Sentence end followed by whitespace and a capital letter or opening quote.
static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([.!?])\s+([\p{Lu}"'‘“])"#).expect("Invalid sentence end regex")
});

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"(?i)^(?:(?:{})\s+(?:\d+|(?-i:[IVXLCDM]+)|{})\b|(?:{})\b)",
        alternation(HEADING_KEYWORDS),
        alternation(HEADING_NUMBER_WORDS),
        alternation(STANDALONE_HEADINGS),
    );
    Regex::new(&pattern).expect("Invalid chapter heading regex")
});

/// How the script is voiced.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VoicingMode {
    /// A single narrator reads everything
    Narrator,
    /// Narrator plus one generic voice for all dialogue
    NarratorAndSpeaker,
    /// Every character gets a voice
    #[default]
    Cast,
}

impl VoicingMode {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Narrator => "Narrator only",
            Self::NarratorAndSpeaker => "Narrator and speaker",
            Self::Cast => "Full cast",
        }
    }

    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Narrator => "narrator".to_string(),
            Self::NarratorAndSpeaker => "narrator_and_speaker".to_string(),
            Self::Cast => "cast".to_string(),
        }
    }
}

impl std::fmt::Display for VoicingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for VoicingMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "narrator" => Ok(Self::Narrator),
            "narrator_and_speaker" => Ok(Self::NarratorAndSpeaker),
            "cast" => Ok(Self::Cast),
            _ => Err(anyhow!("Invalid voicing mode: {}", s)),
        }
    }
}

/// A quotation located in the text, with its optional speaker tag.
#[derive(Debug, Clone)]
struct DialogueMatch {
    /// Byte offset of the opening quote
    start: usize,
    /// Byte offset just past the closing quote
    quote_end: usize,
    /// Byte offset just past the tag, or `quote_end` without a tag
    end: usize,
    tag: Option<SpeakerTag>,
}

/// Rules-based segmenter.
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    mode: VoicingMode,
}

impl Segmenter {
    pub fn new(mode: VoicingMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> VoicingMode {
        self.mode
    }

    /// Segment raw text into lines.
    ///
    /// Empty or whitespace-only input yields no lines. Unbalanced quotes do
    /// not match and end up in narration.
    pub fn segment(&self, text: &str) -> Vec<Line> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let text = expand_abbreviations(text);
        let mut lines = match self.mode {
            VoicingMode::Narrator => narrator_lines(&text),
            VoicingMode::NarratorAndSpeaker | VoicingMode::Cast => self.dialogue_lines(&text),
        };

        for line in &mut lines {
            line.pov = classify_pov(&line.text);
        }

        debug!(
            "Segmented {} chars into {} lines ({} mode)",
            text.len(),
            lines.len(),
            self.mode
        );
        lines
    }

    fn dialogue_lines(&self, text: &str) -> Vec<Line> {
        let mut lines = Vec::new();
        let mut cursor = 0;

        for found in find_dialogue(text) {
            push_narration(&text[cursor..found.start], &mut lines);

            let speaker = match self.mode {
                VoicingMode::Cast => found
                    .tag
                    .as_ref()
                    .and_then(SpeakerTag::speaker)
                    .unwrap_or_else(|| AMBIGUOUS.to_string()),
                _ => GENERIC_SPEAKER.to_string(),
            };
            let mut quotation = collapse_whitespace(&text[found.start..found.quote_end]);
            if found.tag.as_ref().is_some_and(|t| t.leading_comma) {
                quotation.push(',');
            }
            lines.push(Line::new(speaker, quotation));

            if let Some(tag) = &found.tag {
                let tag_text = collapse_whitespace(&tag.text);
                if !tag_text.is_empty() {
                    lines.push(Line::narration(tag_text));
                }
            }
            cursor = found.end;
        }

        push_narration(&text[cursor..], &mut lines);
        lines
    }
}

/// One narrator line per non-blank input line.
fn narrator_lines(text: &str) -> Vec<Line> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(Line::narration)
        .collect()
}

/// All quotations across quote styles, in document order, without overlaps.
///
/// When matches from different styles overlap, the earliest start wins, then
/// the longest span.
fn find_dialogue(text: &str) -> Vec<DialogueMatch> {
    let mut candidates: Vec<DialogueMatch> = QUOTE_STYLES
        .iter()
        .filter(|style| text.contains(style.open))
        .flat_map(|style| quote_spans(text, *style))
        .map(|(start, quote_end)| {
            let tag = extract_tag(&text[quote_end..]);
            let end = quote_end + tag.as_ref().map_or(0, |t| t.len);
            DialogueMatch { start, quote_end, end, tag }
        })
        .collect();

    candidates.sort_by_key(|m| (m.start, Reverse(m.end)));

    let mut accepted: Vec<DialogueMatch> = Vec::with_capacity(candidates.len());
    let mut last_end = 0;
    for candidate in candidates {
        if candidate.start < last_end {
            continue;
        }
        last_end = candidate.end;
        accepted.push(candidate);
    }
    accepted
}

/// Byte spans `(start, end)` of quotations in one quote style.
///
/// For apostrophe-like styles the opening quote must not follow a letter or
/// digit and the closing quote must not precede one, so contractions and
/// possessives never delimit a quotation.
fn quote_spans(text: &str, style: QuoteStyle) -> Vec<(usize, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let is_word = |idx: Option<&(usize, char)>| idx.is_some_and(|(_, c)| c.is_alphanumeric());

    let mut spans = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let (start, c) = chars[i];
        let opens = c == style.open
            && (!style.is_apostrophe()
                || (!is_word(i.checked_sub(1).and_then(|p| chars.get(p)))
                    && chars.get(i + 1).is_some_and(|(_, n)| !n.is_whitespace())));
        if !opens {
            i += 1;
            continue;
        }

        let close = (i + 1..chars.len()).find(|&j| {
            chars[j].1 == style.close && (!style.is_apostrophe() || !is_word(chars.get(j + 1)))
        });
        match close {
            Some(j) => {
                spans.push((start, chars[j].0 + style.close.len_utf8()));
                i = j + 1;
            }
            // No later opener can find a closer either
            None => break,
        }
    }
    spans
}

/// Split narration into chapter headings and sentences.
fn push_narration(chunk: &str, lines: &mut Vec<Line>) {
    for paragraph in BLANK_LINE.split(chunk) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        let mut body = paragraph;
        let (first, rest) = paragraph.split_once('\n').unwrap_or((paragraph, ""));
        if let Some(title) = chapter_heading(first) {
            lines.push(Line::chapter_heading(title));
            body = rest;
        }

        for sentence in split_sentences(body) {
            let sentence = collapse_whitespace(sentence);
            if sentence.chars().count() > MIN_FRAGMENT_CHARS {
                lines.push(Line::narration(sentence));
            }
        }
    }
}

/// Heading title if the line looks like "Chapter 3", "Part Two: Exile" or "Prologue".
fn chapter_heading(line: &str) -> Option<String> {
    let line = collapse_whitespace(line);
    if !HEADING.is_match(&line) {
        return None;
    }
    let words = line.split_whitespace().count();
    let ends_like_prose = line.ends_with(['.', '!', '?']);
    if words > MAX_HEADING_WORDS || (ends_like_prose && words > 3) {
        return None;
    }
    Some(line)
}

/// Split text after sentence-final punctuation followed by whitespace and a
/// capital letter or opening quote.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for caps in SENTENCE_END.captures_iter(text) {
        let (Some(punct), Some(next)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        sentences.push(&text[start..punct.end()]);
        start = next.start();
    }
    sentences.push(&text[start..]);
    sentences
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
