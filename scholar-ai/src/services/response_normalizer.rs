//! Response normalizer
//!
//! Models are asked for bare JSON but reply with fenced blocks, prose
//! preambles, or the array wrapped in a named field. This module recovers the
//! payload. Extraction order, first success wins:
//! 1. whole text
//! 2. inside a fenced code block
//! 3. outermost `[...]` or `{...}`, whichever opens first
//!
//! The recovered value is then shaped into a list of item objects.

use crate::error::{IngestError, IngestResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Characters of raw text carried by `MalformedAiResponse`
const SNIPPET_CHARS: usize = 200;

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```[\w-]*\s*(.*?)```").unwrap());

/// Recover a list of item objects from raw model output
pub fn normalize_items(raw: &str) -> IngestResult<Vec<Value>> {
    let value = extract_json(raw).ok_or_else(|| malformed(raw))?;
    shape_items(value).ok_or_else(|| malformed(raw))
}

/// Recover a single object (variant, knowledge card) from raw model output
pub fn normalize_object(raw: &str) -> IngestResult<Map<String, Value>> {
    match extract_json(raw) {
        Some(Value::Object(map)) => Ok(map),
        Some(Value::Array(items)) => items
            .into_iter()
            .find_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .ok_or_else(|| malformed(raw)),
        _ => Err(malformed(raw)),
    }
}

/// Extract the first parseable JSON array/object from text
pub fn extract_json(raw: &str) -> Option<Value> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(value) = parse_structured(text) {
        return Some(value);
    }

    if let Some(inner) = FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        if let Some(value) = parse_structured(inner.as_str().trim()) {
            return Some(value);
        }
    }

    // A single object with an array field contains both delimiters; whichever
    // opens first is the outer structure.
    let array = outer_span(text, '[', ']');
    let object = outer_span(text, '{', '}');
    let ordered = match (array, object) {
        (Some(a), Some(o)) if o.0 < a.0 => [Some(o), Some(a)],
        (a, o) => [a, o],
    };
    ordered
        .into_iter()
        .flatten()
        .find_map(|(start, end)| parse_structured(&text[start..=end]))
}

/// Only arrays and objects count as a payload
fn parse_structured(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Array(_) | Value::Object(_))) => Some(value),
        _ => None,
    }
}

fn outer_span(text: &str, open: char, close: char) -> Option<(usize, usize)> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then_some((start, end))
}

fn shape_items(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => {
            // A bare question object
            if map.get("content").map_or(false, Value::is_string) {
                return Some(vec![Value::Object(map)]);
            }
            let mut arrays = map.into_iter().filter_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            });
            let first = arrays.next()?;
            if arrays.next().is_some() {
                return None;
            }
            Some(first)
        }
        _ => None,
    }
}

fn malformed(raw: &str) -> IngestError {
    IngestError::MalformedAiResponse {
        snippet: snippet(raw),
    }
}

/// First characters of `raw`, cut on a char boundary
pub fn snippet(raw: &str) -> String {
    raw.trim().chars().take(SNIPPET_CHARS).collect()
}
