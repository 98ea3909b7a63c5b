/*!
 * Lenient parsing of LLM responses.
 *
 * Models wrap JSON in markdown fences, prepend chatter or emit loose
 * `key: value` text. JSON is located in this order of preference:
 * 1. fenced block holding an object
 * 2. fenced block holding an array
 * 3. first `[` to last `]`
 * 4. first `{` to last `}`
 * 5. the whole trimmed response
 *
 * When no tier yields valid JSON, [`extract_key_values`] recovers records
 * from `key: value` text.
 */

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").expect("Invalid fenced block regex"));

/// Locate and parse JSON in a model response
pub fn extract_json(response: &str) -> Option<Value> {
    let trimmed = response.trim();
    let fenced: Vec<&str> = FENCED_BLOCK
        .captures_iter(trimmed)
        .filter_map(|c| c.get(1).map(|m| m.as_str().trim()))
        .collect();

    let fenced_with = |open: char| {
        fenced
            .iter()
            .filter(|block| block.starts_with(open))
            .find_map(|block| serde_json::from_str::<Value>(block).ok())
    };

    fenced_with('{')
        .or_else(|| fenced_with('['))
        .or_else(|| scan_span(trimmed, '[', ']'))
        .or_else(|| scan_span(trimmed, '{', '}'))
        .or_else(|| serde_json::from_str(trimmed).ok())
}

fn scan_span(text: &str, open: char, close: char) -> Option<Value> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Locate a JSON array of records in a model response.
///
/// A bare array is returned as is; for an object, the value under `key` is
/// used when it is an array, otherwise the first array-valued field.
pub fn extract_json_array(response: &str, key: Option<&str>) -> Option<Vec<Value>> {
    match extract_json(response)? {
        Value::Array(items) => Some(items),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = key.and_then(|k| map.get(k)) {
                return Some(items.clone());
            }
            map.into_iter().find_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            })
        }
        _ => None,
    }
}

/// Recover `key: value` records from non-JSON text.
///
/// A new record starts whenever the first of `keys` appears. Values may be
/// quoted; unquoted values end at a comma, brace, bracket or newline.
pub fn extract_key_values(text: &str, keys: &[&str]) -> Vec<HashMap<String, String>> {
    let Some(first_key) = keys.first() else {
        return Vec::new();
    };
    let alternation = keys.iter().map(|k| regex::escape(k)).collect::<Vec<_>>().join("|");
    let Ok(pattern) = Regex::new(&format!(
        r#"(?i)["']?\b({})\b["']?\s*[:=]\s*("(?:[^"\\]|\\.)*"|'[^']*'|[^,\n\}}\]]*)"#,
        alternation
    )) else {
        return Vec::new();
    };

    let mut records: Vec<HashMap<String, String>> = Vec::new();
    for caps in pattern.captures_iter(text) {
        let key = caps[1].to_lowercase();
        let value = unquote(caps[2].trim()).to_string();
        let starts_record = key.eq_ignore_ascii_case(first_key);
        let extends_current = !starts_record && records.last().is_some_and(|r| !r.contains_key(&key));
        if extends_current {
            if let Some(record) = records.last_mut() {
                record.insert(key, value);
            }
        } else if starts_record || records.is_empty() {
            records.push(HashMap::from([(key, value)]));
        }
    }
    records
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Read a field as a string; numbers and booleans are stringified
pub fn value_str(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read a field as a boolean, accepting `"true"`/`"yes"` strings
pub fn value_bool(record: &Value, key: &str) -> Option<bool> {
    match record.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}

/// Read a field as an index, accepting numeric strings
pub fn value_usize(record: &Value, key: &str) -> Option<usize> {
    match record.get(key)? {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Lenient boolean parsing for model output
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().trim_matches(|c| c == '"' || c == '\'').to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extractJson_fencedObject_shouldWinOverBareArray() {
        let response = "Sure: [1, 2]\n```json\n{\"character_groups\": []}\n```";
        let value = extract_json(response).unwrap();
        assert!(value.get("character_groups").is_some());
    }

    #[test]
    fn test_extractJson_fencedArray_shouldParse() {
        let response = "```\n[{\"index\": 3}]\n```";
        let value = extract_json(response).unwrap();
        assert_eq!(value[0]["index"], 3);
    }

    #[test]
    fn test_extractJson_chatterAroundArray_shouldBracketScan() {
        let response = "Here you go: [{\"index\": 1, \"suggested_action\": \"keep\"}] Hope it helps!";
        let items = extract_json_array(response, None).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_extractJson_objectWithChatter_shouldBraceScan() {
        let response = "Result: {\"primary_name\": \"Ann\"} done";
        assert_eq!(extract_json(response).unwrap()["primary_name"], "Ann");
    }

    #[test]
    fn test_extractJson_garbage_shouldReturnNone() {
        assert!(extract_json("no json at all").is_none());
    }

    #[test]
    fn test_extractJsonArray_objectWrapper_shouldUseNamedKey() {
        let response = r#"{"note": "x", "character_groups": [{"primary_name": "Ann"}]}"#;
        let items = extract_json_array(response, Some("character_groups")).unwrap();
        assert_eq!(items[0]["primary_name"], "Ann");
    }

    #[test]
    fn test_extractKeyValues_looseText_shouldSplitRecords() {
        let text = "original_name: said, is_name: false, suggested_name: John Doe\n\
                    original_name: \"Mary\", is_name: true";
        let records = extract_key_values(text, &["original_name", "is_name", "suggested_name", "reason"]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["original_name"], "said");
        assert_eq!(records[0]["is_name"], "false");
        assert_eq!(records[0]["suggested_name"], "John Doe");
        assert_eq!(records[1]["original_name"], "Mary");
    }

    #[test]
    fn test_valueAccessors_shouldBeLenient() {
        let record: Value = serde_json::json!({"index": "4", "is_dialogue": "yes", "name": 7});
        assert_eq!(value_usize(&record, "index"), Some(4));
        assert_eq!(value_bool(&record, "is_dialogue"), Some(true));
        assert_eq!(value_str(&record, "name").as_deref(), Some("7"));
        assert_eq!(value_str(&record, "missing"), None);
    }
}
