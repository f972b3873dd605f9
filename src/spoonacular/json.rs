//! JSON parsing utilities for the Spoonacular API client.

use anyhow::{Result, anyhow};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Parse a response body, reporting the serde path, a readable type mismatch,
/// and a caret snippet of the offending line on failure.
pub fn parse_json_with_context<T: DeserializeOwned>(body: &str) -> Result<T> {
    let deserializer = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(deserializer).map_err(|err| {
        let (line, column) = (err.inner().line(), err.inner().column());
        anyhow!(
            "{}{} (line {line} col {column})\n{}",
            path_prefix(&err.path().to_string()),
            describe_mismatch(&err.inner().to_string()),
            snippet_around(body, line, column, 20)
        )
    })
}

/// Decode a typed record out of an already-parsed payload.
///
/// Payloads live in the cache as untyped values, so the typed view is
/// produced on every read. Errors carry the serde path of the offending field.
pub fn decode_value_with_context<T: DeserializeOwned>(value: &Value) -> Result<T> {
    serde_path_to_error::deserialize(value).map_err(|err| {
        anyhow!(
            "{}{}",
            path_prefix(&err.path().to_string()),
            describe_mismatch(&err.inner().to_string())
        )
    })
}

fn path_prefix(path: &str) -> String {
    match path {
        "" | "." => String::new(),
        path => format!("at path '{path}': "),
    }
}

/// Reword serde's "invalid type: X, expected Y" as "expected Y, got X" and
/// drop the trailing location, which is reported separately.
fn describe_mismatch(message: &str) -> String {
    let message = message.split(" at line ").next().unwrap_or(message).trim();
    if let Some((_, rest)) = message.split_once("invalid type: ")
        && let Some((actual, expected)) = rest.split_once(", expected ")
    {
        return format!("expected {expected}, got {actual}");
    }
    message.to_owned()
}

/// A window of `width` bytes around the 1-based `line`/`column`, with a caret under the column.
fn snippet_around(body: &str, line: usize, column: usize, width: usize) -> String {
    let Some(text) = body.lines().nth(line.saturating_sub(1)).filter(|l| !l.is_empty()) else {
        return "(empty line)".to_owned();
    };

    let at = column.saturating_sub(1).min(text.len());
    let mut from = at.saturating_sub(width / 2);
    while !text.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = (at + width / 2).min(text.len());
    while !text.is_char_boundary(to) {
        to += 1;
    }

    format!("...{}...\n   {}^", &text[from..to], " ".repeat(at - from))
}
