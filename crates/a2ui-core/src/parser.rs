//! Whole-response message parsing.
//!
//! Assumes the text is complete. Candidate JSON is taken, in order, from a
//! fenced code block, from the outermost `[ ... { ... } ... ]` span, and
//! finally from the trimmed text itself; the first candidate that is valid
//! JSON is decoded. A lone object is treated as a one-element list.

use crate::error::ParseError;
use crate::message::{Message, parse_message_value};
use serde_json::Value;

const FENCE: &str = "```";

/// Interior of the first fenced block, without its language tag.
///
/// An unterminated fence runs to the end of the text.
fn extract_fenced(text: &str) -> Option<&str> {
    let start = text.find(FENCE)?;
    let after = &text[start + FENCE.len()..];
    let tag_len = after
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(after.len());
    let body = &after[tag_len..];
    let body = match body.find(FENCE) {
        Some(end) => &body[..end],
        None => body,
    };
    let body = body.trim();
    (!body.is_empty()).then_some(body)
}

/// Greedy `[ ... { ... } ... ]` span: first `[` to last `]`, which must
/// enclose at least one brace pair.
fn extract_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    let span = &text[start..=end];
    let open = span.find('{')?;
    span[open..].rfind('}')?;
    Some(span)
}

pub fn parse_messages(text: &str) -> Result<Vec<Message>, ParseError> {
    for candidate in [extract_fenced(text), extract_array(text)].into_iter().flatten() {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            return messages_from_value(value);
        }
    }
    let value = serde_json::from_str::<Value>(text.trim()).map_err(ParseError::InvalidJson)?;
    messages_from_value(value)
}

/// Decode a parsed JSON value (array or single object) into messages.
pub fn messages_from_value(value: Value) -> Result<Vec<Message>, ParseError> {
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            parse_message_value(item).map_err(|source| ParseError::InvalidMessage { index, source })
        })
        .collect()
}
