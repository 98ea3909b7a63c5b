/*!
 * Pattern tables used by the segmenter.
 *
 * The tables are plain data so they can be tested and extended without
 * touching the segmentation algorithm. Compiled regexes built from them live
 * next to their users.
 */

/// Title, rank and clergy abbreviations with their spoken form.
///
/// Order matters: compound forms must precede their first component.
pub const ABBREVIATIONS: &[(&str, &str)] = &[
    ("Lt. Cmdr.", "Lieutenant Commander"),
    ("Lt. Gen.", "Lieutenant General"),
    ("Lt. Col.", "Lieutenant Colonel"),
    ("Mr.", "Mister"),
    ("Mrs.", "Missus"),
    ("Ms.", "Miss"),
    ("Dr.", "Doctor"),
    ("St.", "Saint"),
    ("Capt.", "Captain"),
    ("Cmdr.", "Commander"),
    ("Adm.", "Admiral"),
    ("Ens.", "Ensign"),
    ("Gen.", "General"),
    ("Lt.", "Lieutenant"),
    ("Col.", "Colonel"),
    ("Sgt.", "Sergeant"),
    ("Maj.", "Major"),
    ("Pvt.", "Private"),
    ("Cpl.", "Corporal"),
    ("Gov.", "Governor"),
    ("Sen.", "Senator"),
    ("Rep.", "Representative"),
    ("Pres.", "President"),
    ("Amb.", "Ambassador"),
    ("Rev.", "Reverend"),
    ("Prof.", "Professor"),
    ("Hon.", "Honorable"),
    ("Ld.", "Lord"),
    ("Ly.", "Lady"),
    ("Sir.", "Sir"),
];

/// Reporting verbs recognised in speaker tags ("John said", "asked Mary").
pub const REPORTING_VERBS: &[&str] = &[
    "said", "says", "asked", "asks", "replied", "replies", "answered", "shouted", "shouts",
    "whispered", "whispers", "muttered", "mutters", "protested", "exclaimed", "gasped",
    "continued", "began", "explained", "added", "agreed", "announced", "argued", "barked",
    "begged", "bellowed", "blurted", "boasted", "called", "chuckled", "conceded", "confessed",
    "confirmed", "corrected", "countered", "cried", "croaked", "declared", "demanded",
    "drawled", "echoed", "grumbled", "growled", "grunted", "hissed", "howled", "inquired",
    "insisted", "instructed", "interrupted", "joked", "laughed", "lied", "mentioned",
    "moaned", "mumbled", "murmured", "mused", "noted", "objected", "observed", "offered",
    "ordered", "panted", "persisted", "pleaded", "pressed", "promised", "prompted", "purred",
    "queried", "quipped", "raged", "ranted", "reasoned", "reassured", "recalled", "remarked",
    "reminded", "repeated", "reported", "responded", "retorted", "roared", "sang", "scoffed",
    "scolded", "screamed", "shrieked", "sighed", "snapped", "snarled", "sneered", "sobbed",
    "speculated", "spat", "sputtered", "stammered", "stated", "stuttered", "suggested",
    "teased", "threatened", "thundered", "told", "urged", "uttered", "vowed", "wailed",
    "warned", "wept", "whined", "wondered", "yelled",
];

/// Personal pronouns that may appear in a speaker tag but never name a speaker.
///
/// English only.
pub const PRONOUNS: &[&str] = &[
    "he", "she", "they", "i", "we", "you", "it", "him", "her", "them", "me", "us", "one",
    "someone", "somebody", "everyone",
];

/// A pair of opening and closing quote characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteStyle {
    pub open: char,
    pub close: char,
}

impl QuoteStyle {
    /// Single-quote styles share their closing character with the apostrophe
    /// and need boundary checks.
    pub fn is_apostrophe(&self) -> bool {
        self.close == '\'' || self.close == '\u{2019}'
    }
}

/// Quote styles recognised as dialogue delimiters, in scan order.
pub const QUOTE_STYLES: &[QuoteStyle] = &[
    QuoteStyle { open: '"', close: '"' },
    QuoteStyle { open: '\'', close: '\'' },
    QuoteStyle { open: '\u{201C}', close: '\u{201D}' },
    QuoteStyle { open: '\u{2018}', close: '\u{2019}' },
];

/// Words that open a numbered heading ("Chapter 3", "Part Two").
pub const HEADING_KEYWORDS: &[&str] = &["chapter", "book", "part", "section"];

/// Headings that stand on their own without a number.
pub const STANDALONE_HEADINGS: &[&str] = &["prologue", "epilogue"];

/// Spelled-out numbers accepted after a heading keyword.
pub const HEADING_NUMBER_WORDS: &[&str] = &[
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
    "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen", "nineteen",
    "twenty", "first", "last", "final",
];

/// Heading lines longer than this many words are treated as prose.
pub const MAX_HEADING_WORDS: usize = 8;

/// Narration fragments of this many characters or fewer are dropped.
pub const MIN_FRAGMENT_CHARS: usize = 2;

/// Check whether a word is a personal pronoun (case-insensitive).
pub fn is_pronoun(word: &str) -> bool {
    let lower = word.trim().to_lowercase();
    PRONOUNS.contains(&lower.as_str())
}

/// Regex alternation over a word table, longest words first.
pub fn alternation(words: &[&str]) -> String {
    let mut sorted: Vec<&str> = words.to_vec();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    sorted
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}
