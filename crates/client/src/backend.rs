use serde::{Deserialize, Serialize};
use studychat_core::{Attachment, Message, Result, Role, SessionMetadata, Timestamp};

use crate::decode::decode_content;

/// The three backend operations a transcript view consumes.
///
/// The wire format is owned by the backend; implementations translate it
/// into these calls.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Up to `limit` messages strictly older than `before` (or the newest
    /// `limit` when `before` is `None`), ordered oldest-to-newest.
    async fn fetch_history(&self, session_id: &str, limit: usize, before: Option<&Timestamp>)
    -> Result<Vec<HistoryMessage>>;

    /// Submit a user message with an optional file; returns the raw reply body.
    async fn submit_message(
        &self, session_id: &str, discipline_id: &str, text: &str, attachment: Option<&Attachment>,
    ) -> Result<String>;

    /// Descriptive fields shown above the transcript.
    async fn fetch_session_metadata(&self, session_id: &str) -> Result<SessionMetadata>;
}

/// A persisted message as returned by the history endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    /// Plain string, JSON-encoded string, or structured reply object
    #[serde(default)]
    pub content: serde_json::Value,
    pub timestamp: Timestamp,
}

impl HistoryMessage {
    pub fn new(role: Role, content: impl Into<String>, timestamp: Timestamp) -> Self {
        Self { role, content: serde_json::Value::String(content.into()), timestamp }
    }

    /// Convert to a transcript entry, decoding structured content
    pub fn into_message(self) -> Message {
        Message::history(self.role, decode_content(self.content), self.timestamp)
    }
}

/// History response body; older backend revisions return a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum HistoryEnvelope {
    Wrapped { messages: Vec<HistoryMessage> },
    Bare(Vec<HistoryMessage>),
}

impl HistoryEnvelope {
    pub(crate) fn into_messages(self) -> Vec<HistoryMessage> {
        match self {
            HistoryEnvelope::Wrapped { messages } => messages,
            HistoryEnvelope::Bare(messages) => messages,
        }
    }
}

/// Session metadata response body
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum MetadataEnvelope {
    Wrapped { study_session: SessionMetadata },
    Bare(SessionMetadata),
}

impl MetadataEnvelope {
    pub(crate) fn into_metadata(self) -> SessionMetadata {
        match self {
            MetadataEnvelope::Wrapped { study_session } => study_session,
            MetadataEnvelope::Bare(metadata) => metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studychat_core::Origin;

    #[test]
    fn test_history_envelope_wrapped() {
        let body = r#"{"messages": [
            {"role": "user", "content": "what is a matrix?", "timestamp": "2024-05-01T12:00:00"},
            {"role": "assistant", "content": "{\"type\":\"image\",\"content\":\"this\",\"image\":\"m.png\"}", "timestamp": "2024-05-01T12:00:05"}
        ]}"#;

        let messages = serde_json::from_str::<HistoryEnvelope>(body).unwrap().into_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);

        let reply = messages[1].clone().into_message();
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.image(), Some("m.png"));
        assert_eq!(reply.origin, Origin::History);
        assert!(reply.timestamp.is_some());
    }

    #[test]
    fn test_history_envelope_bare() {
        let body = r#"[{"role": "user", "content": "hi", "timestamp": 1714566600}]"#;
        let messages = serde_json::from_str::<HistoryEnvelope>(body).unwrap().into_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].clone().into_message().text(), "hi");
    }

    #[test]
    fn test_history_message_requires_timestamp() {
        let body = r#"{"messages": [{"role": "user", "content": "hi"}]}"#;
        assert!(serde_json::from_str::<HistoryEnvelope>(body).is_err());
    }

    #[test]
    fn test_metadata_envelope() {
        let body = r#"{"study_session": {"IdSessao": 3, "Assunto": "Calculus"}}"#;
        let meta = serde_json::from_str::<MetadataEnvelope>(body).unwrap().into_metadata();
        assert_eq!(meta.id, "3");
        assert_eq!(meta.subject, "Calculus");

        let body = r#"{"id": "4", "subject": "Biology"}"#;
        let meta = serde_json::from_str::<MetadataEnvelope>(body).unwrap().into_metadata();
        assert_eq!(meta.subject, "Biology");
    }
}
