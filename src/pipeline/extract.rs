//! Best-effort extraction of a JSON object embedded in free text.
//!
//! The model is asked for "a Markdown table and JSON", so its reply is prose
//! with a JSON object somewhere inside, often in a code fence. This is a
//! heuristic, not a parser of the whole reply.
//!
//! [`ExtractionStrategy::OuterBraces`] takes everything from the first `{` to
//! the last `}` and parses it as one document. It is only reliable when the
//! reply holds exactly one object and no other braces; two objects, or a
//! brace in the surrounding prose, make it fail. That behaviour is kept as is.
//!
//! [`ExtractionStrategy::FirstBalancedObject`] walks the text tracking brace
//! depth (ignoring braces inside JSON strings) and returns the first span that
//! closes at depth zero and parses.

use crate::config::ExtractionStrategy;
use crate::error::ExtractionError;
use serde_json::Value;

/// Extract with the default [`ExtractionStrategy::OuterBraces`] strategy.
pub fn extract_record(text: &str) -> Result<Value, ExtractionError> {
    outer_braces(text)
}

/// Extract with an explicit strategy.
pub fn extract_with(text: &str, strategy: ExtractionStrategy) -> Result<Value, ExtractionError> {
    match strategy {
        ExtractionStrategy::OuterBraces => outer_braces(text),
        ExtractionStrategy::FirstBalancedObject => first_balanced_object(text),
    }
}

fn outer_braces(text: &str) -> Result<Value, ExtractionError> {
    let start = text.find('{').ok_or(ExtractionError::MissingOpenBrace)?;
    let end = text.rfind('}').ok_or(ExtractionError::MissingCloseBrace)?;
    if end < start {
        return Err(ExtractionError::BracesOutOfOrder);
    }

    serde_json::from_str(&text[start..=end]).map_err(|e| ExtractionError::InvalidJson {
        detail: e.to_string(),
    })
}

fn first_balanced_object(text: &str) -> Result<Value, ExtractionError> {
    if !text.contains('{') {
        return Err(ExtractionError::MissingOpenBrace);
    }
    if !text.contains('}') {
        return Err(ExtractionError::MissingCloseBrace);
    }

    let mut from = 0;
    while let Some(offset) = text[from..].find('{') {
        let start = from + offset;
        if let Some(end) = balanced_end(text, start) {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                return Ok(value);
            }
        }
        from = start + 1;
    }

    Err(ExtractionError::NoBalancedObject)
}

/// Byte index of the `}` that closes the `{` at `start`, if the text has one.
///
/// Quote tracking is JSON-style: only `"` opens a string and `\` escapes the
/// next character inside it.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
