use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::message::Timestamp;

/// Identity of the session view a transcript belongs to
///
/// Both identifiers are opaque to the client and passed through to every
/// backend call unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionContext {
    pub session_id: String,
    pub discipline_id: String,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, discipline_id: impl Into<String>) -> Self {
        Self { session_id: session_id.into(), discipline_id: discipline_id.into() }
    }
}

impl fmt::Display for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session {} (discipline {})", self.session_id, self.discipline_id)
    }
}

/// Read-only descriptive fields shown above a transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(rename = "IdSessao", alias = "id", alias = "session_id", deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(rename = "Assunto", alias = "subject", default)]
    pub subject: String,
    #[serde(rename = "Inicio", alias = "start", alias = "starts_at", default, deserialize_with = "lenient_timestamp")]
    pub starts_at: Option<Timestamp>,
    #[serde(rename = "Fim", alias = "end", alias = "ends_at", default, deserialize_with = "lenient_timestamp")]
    pub ends_at: Option<Timestamp>,
    #[serde(rename = "Produtividade", alias = "productivity", default, deserialize_with = "optional_opaque")]
    pub productivity: Option<String>,
    #[serde(rename = "IdDisciplina", alias = "discipline_id", default, deserialize_with = "optional_opaque")]
    pub discipline_id: Option<String>,
    /// Fields this client does not interpret
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SessionMetadata {
    /// One-line header for the transcript view
    pub fn headline(&self) -> String {
        let subject = if self.subject.trim().is_empty() { "Untitled session" } else { self.subject.trim() };
        match (&self.starts_at, &self.ends_at) {
            (Some(start), Some(end)) => format!(
                "{} ({} - {})",
                subject,
                start.as_datetime().format("%Y-%m-%d %H:%M"),
                end.as_datetime().format("%H:%M")
            ),
            (Some(start), None) => format!("{} ({})", subject, start.as_datetime().format("%Y-%m-%d %H:%M")),
            _ => subject.to_string(),
        }
    }
}

fn value_to_opaque(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn opaque_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    value_to_opaque(value).ok_or_else(|| serde::de::Error::custom("session id is null"))
}

fn optional_opaque<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value_to_opaque(value))
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Timestamp>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value::<Timestamp>(value).ok())
}
