// json_repair.rs — best-effort JSON object extraction from free-form model output

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Extract the first well-formed JSON object from `text`.
///
/// Tries, in order: a strict parse of the whole (fence-stripped) text, each
/// brace-matched `{...}` span, the widest `{...}` span with trailing commas
/// removed, and finally a bracket-balancing repair of a truncated tail.
/// Returns `None` when nothing yields an object; never panics.
pub fn extract_object(text: &str) -> Option<Map<String, Value>> {
    let trimmed = strip_fences(text.trim());
    if trimmed.is_empty() {
        return None;
    }

    if let Some(obj) = parse_object(trimmed) {
        return Some(obj);
    }

    for span in balanced_spans(trimmed) {
        if let Some(obj) = parse_object(span) {
            return Some(obj);
        }
        if let Some(obj) = parse_object(&remove_trailing_commas(span)) {
            return Some(obj);
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            let widest = remove_trailing_commas(&trimmed[start..=end]);
            if let Some(obj) = parse_object(&widest) {
                return Some(obj);
            }
        }
    }

    let start = trimmed.find('{')?;
    let repaired = close_open_brackets(&remove_trailing_commas(&trimmed[start..]));
    parse_object(&repaired)
}

/// Extract an object and deserialize it into `T`.
pub fn extract_as<T: DeserializeOwned>(text: &str) -> Option<T> {
    let obj = extract_object(text)?;
    serde_json::from_value(Value::Object(obj)).ok()
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

fn strip_fences(text: &str) -> &str {
    static FENCE_RE: OnceLock<Regex> = OnceLock::new();
    let re = FENCE_RE.get_or_init(|| {
        Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*(```)?$").expect("valid fence regex")
    });
    match re.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text,
    }
}

fn remove_trailing_commas(text: &str) -> String {
    static COMMA_RE: OnceLock<Regex> = OnceLock::new();
    let re = COMMA_RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("valid comma regex"));
    re.replace_all(text, "$1").into_owned()
}

/// Every top-level `{...}` span whose braces balance, skipping braces that
/// appear inside string literals.
fn balanced_spans(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, &byte) in bytes.iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = Some(idx);
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        spans.push(&text[s..=idx]);
                    }
                }
            }
            _ => {}
        }
    }

    spans
}

/// Close an unterminated string and any open `{`/`[` in reverse order.
fn close_open_brackets(text: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in text.chars() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut repaired = text.trim_end().to_string();
    if in_string {
        repaired.push('"');
    }
    // A dangling key or separator cannot be closed into valid JSON.
    while repaired.ends_with(',') || repaired.ends_with(':') {
        repaired.pop();
    }
    while let Some(closer) = stack.pop() {
        repaired.push(closer);
    }
    repaired
}
