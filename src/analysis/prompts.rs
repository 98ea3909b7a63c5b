/*!
 * Prompt templates for the analysis passes.
 *
 * Every prompt is rendered into the ChatML envelope by [`LlmClient::chatml`].
 * Resolver prompts ask for one line of plain text; the batch prompts ask for
 * JSON.
 */

use super::llm::LlmClient;

/// Marker for context lines missing before the first line
pub const START_OF_TEXT: &str = "[Start of Text]";

/// Marker for context lines missing after the last line
pub const END_OF_TEXT: &str = "[End of Text]";

/// System prompt for speaker identification
pub const RESOLVER_SYSTEM: &str = "You are a literary analyst. Your task is to identify the speaker of a \
specific line of dialogue given its surrounding context. You must follow all instructions precisely.";

/// System prompt for quote fragment classification
pub const FRAGMENTS_SYSTEM: &str = r#"You are a proofreader repairing an automatically segmented novel.

## Your Task
Some short quoted pieces were split away from the line they belong to, for example
a possessive "'s" or a nickname in quotes inside a sentence. Decide for each
candidate whether it is independent dialogue or a fragment.

## Actions
- "keep": the candidate is real dialogue and stays a separate line
- "append_prev": the candidate continues the previous line
- "append_next": the candidate starts the next line

## Output Requirements
- Respond with a JSON list only, one object per candidate
- Each object: {"index": <candidate index>, "is_dialogue": true|false, "suggested_action": "keep"|"append_prev"|"append_next"}"#;

/// System prompt for speaker name validation
pub const VALIDATION_SYSTEM: &str = r#"You are an editor checking the speaker labels of a novel's dialogue.

## Your Task
Labels were extracted automatically and sometimes contain verbs, pronouns or
sentence residue instead of a character name. For each label decide whether it
is a proper character name. When it is not, suggest the character name that the
sample line points to, or leave the suggestion empty.

## Output Requirements
Return JSON array only: [{"original_name": "...", "is_name": true|false, "suggested_name": "...", "reason": "..."}]"#;

/// System prompt for character grouping
pub const GROUPING_SYSTEM: &str = r#"You are an expert literary analyst specializing in character co-reference resolution.

## Your Task
Group speaker names that refer to the same character.

## Grouping Rules
- Only merge names that are clearly the same character
- Never merge a generic title ("the captain", "the old man") with a proper name
- Keep Narrator separate from every character
- Prefer the most complete name as the primary name
- A name without aliases forms a group of its own

## Output Requirements
Respond with a JSON object only:
{"character_groups": [{"primary_name": "Full Name", "aliases": ["Nickname", "Surname"]}]}"#;

/// Context lines around a line being resolved
#[derive(Debug, Clone, PartialEq)]
pub struct LineContext {
    pub before: Vec<String>,
    pub line: String,
    pub after: Vec<String>,
}

impl LineContext {
    fn render_side(lines: &[String], marker: &str) -> String {
        if lines.is_empty() {
            marker.to_string()
        } else {
            lines.join("\n")
        }
    }

    fn render(&self) -> String {
        format!(
            "CONTEXT BEFORE:\n{}\n\nDIALOGUE: {}\n\nCONTEXT AFTER:\n{}",
            Self::render_side(&self.before, START_OF_TEXT),
            self.line,
            Self::render_side(&self.after, END_OF_TEXT)
        )
    }
}

/// Prompt asking who speaks a line, with gender and age range
pub fn identification_prompt(context: &LineContext) -> String {
    let user = format!(
        "Based on the context below, who is the speaker of the DIALOGUE line?\n\n{}\n\n\
         CRITICAL INSTRUCTIONS:\n\
         1. Respond with exactly one line in the form: Speaker, Gender, AgeRange\n\
         2. Gender is Male, Female or Unknown. AgeRange is Child, Teen, Adult, Elderly or Unknown.\n\
         3. If the speaker cannot be determined from the context, respond with: Unknown, Unknown, Unknown\n\
         4. Do not add any explanation or other words.",
        context.render()
    );
    LlmClient::chatml(RESOLVER_SYSTEM, &user)
}

/// Prompt asking for the gender and age range of a known speaker
pub fn profile_prompt(speaker: &str, context: &LineContext) -> String {
    let user = format!(
        "The DIALOGUE line below is spoken by {speaker}. Based on the context, describe {speaker}.\n\n{}\n\n\
         CRITICAL INSTRUCTIONS:\n\
         1. Respond with exactly one line in the form: {speaker}, Gender, AgeRange\n\
         2. Gender is Male, Female or Unknown. AgeRange is Child, Teen, Adult, Elderly or Unknown.\n\
         3. Do not add any explanation or other words.",
        context.render()
    );
    LlmClient::chatml(RESOLVER_SYSTEM, &user)
}

/// Prompt classifying quote fragment candidates, one `CAND:` line each
pub fn fragment_prompt(candidate_lines: &[String]) -> String {
    let user = format!(
        "Classify each candidate. PREV and NEXT are the neighbouring lines.\n\n{}",
        candidate_lines.join("\n")
    );
    LlmClient::chatml(FRAGMENTS_SYSTEM, &user)
}

/// Prompt validating a batch of speaker labels
pub fn validation_prompt(entries: &[String]) -> String {
    let user = format!("Speaker labels with a sample line each:\n\n{}", entries.join("\n"));
    LlmClient::chatml(VALIDATION_SYSTEM, &user)
}

/// Prompt grouping a batch of speaker names
pub fn grouping_prompt(entries: &[String]) -> String {
    let user = format!(
        "Here is a list of speaker names with the first line each one speaks:\n\n{}",
        entries.join("\n")
    );
    LlmClient::chatml(GROUPING_SYSTEM, &user)
}
