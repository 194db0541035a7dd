//! Normalisation of reply payloads.
//!
//! The chat endpoint has answered with a bare string, a tagged object, a
//! `{"response": ...}` envelope and a JSON-encoded string of any of those.
//! Decoding walks an ordered fallback chain and never fails: anything it
//! cannot interpret becomes plain text equal to the raw body.

use serde_json::{Map, Value};
use studychat_core::MessageContent;

/// How many envelopes / encoded strings are unwrapped before giving up
const MAX_DEPTH: usize = 3;

/// Decode a raw reply body into message content.
pub fn decode_reply(raw: &str) -> MessageContent {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => decode_value(value, MAX_DEPTH).unwrap_or_else(|| MessageContent::Text(raw.to_string())),
        Err(_) => MessageContent::Text(raw.to_string()),
    }
}

/// Decode the `content` field of a history message.
pub fn decode_content(value: Value) -> MessageContent {
    match value {
        Value::String(s) => decode_reply(&s),
        Value::Null => MessageContent::Text(String::new()),
        other => {
            let raw = other.to_string();
            decode_value(other, MAX_DEPTH).unwrap_or(MessageContent::Text(raw))
        }
    }
}

fn decode_value(value: Value, depth: usize) -> Option<MessageContent> {
    match value {
        Value::String(s) => {
            if depth > 0
                && let Ok(inner) = serde_json::from_str::<Value>(&s)
                && (inner.is_object() || inner.is_string())
                && let Some(content) = decode_value(inner, depth - 1)
            {
                return Some(content);
            }
            Some(MessageContent::Text(s))
        }
        Value::Object(map) => decode_object(map, depth),
        _ => None,
    }
}

fn decode_object(mut map: Map<String, Value>, depth: usize) -> Option<MessageContent> {
    let kind = map.get("type").and_then(Value::as_str).map(|s| s.trim().to_lowercase());

    match kind.as_deref() {
        Some("image") | Some("multimodal") => {
            let text = map.get("content").map(value_text).unwrap_or_default();
            let image = map.get("image").and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty());
            Some(match image {
                Some(image) => MessageContent::WithImage { text, image: image.to_string() },
                None => MessageContent::Text(text),
            })
        }
        Some("text") => map.get("content").map(|c| MessageContent::Text(value_text(c))),
        Some(_) => None,
        None if depth > 0 => map.remove("response").and_then(|inner| decode_value(inner, depth - 1)),
        None => None,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
