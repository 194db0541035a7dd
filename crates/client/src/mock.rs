use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use studychat_core::{Attachment, Error, Result, Role, SessionMetadata, Timestamp};
use tokio::sync::{Semaphore, watch};

use crate::backend::{Backend, HistoryMessage};

/// Scripted outcome of a chat submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MockReply {
    /// Successful response with this raw body
    Body { body: String },
    /// Transport failure
    Failure { message: String },
    /// Non-success HTTP status
    Status { status: u16, #[serde(default)] body: String },
}

impl MockReply {
    pub fn body(body: impl Into<String>) -> Self {
        MockReply::Body { body: body.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        MockReply::Failure { message: message.into() }
    }
}

/// Mock script loaded from TOML
#[derive(Debug, Default, Deserialize)]
pub struct MockScript {
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
    #[serde(default)]
    pub replies: Vec<MockReply>,
    #[serde(default)]
    pub metadata: Option<SessionMetadata>,
}

impl MockScript {
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Parse(format!("invalid mock script: {}", e)))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// A backend call as observed by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    History { session_id: String, limit: usize, before: Option<Timestamp> },
    Submit { session_id: String, discipline_id: String, text: String, attachment: Option<String> },
    Metadata { session_id: String },
}

#[derive(Default)]
struct MockState {
    default_history: Vec<HistoryMessage>,
    sessions: HashMap<String, Vec<HistoryMessage>>,
    replies: VecDeque<MockReply>,
    metadata: Option<SessionMetadata>,
    history_failures: usize,
    calls: Vec<RecordedCall>,
}

impl MockState {
    fn history_for(&self, session_id: &str) -> &[HistoryMessage] {
        self.sessions.get(session_id).unwrap_or(&self.default_history)
    }
}

/// In-memory backend for deterministic testing without a server.
///
/// Calls are recorded before they wait on the gate, so a test can observe a
/// request in flight and act while it is still open.
pub struct MockBackend {
    state: Mutex<MockState>,
    gate: Option<Arc<Semaphore>>,
    call_count: watch::Sender<usize>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self { state: Mutex::new(MockState::default()), gate: None, call_count: watch::Sender::new(0) }
    }

    /// Every request waits for a [`MockBackend::release`] before answering
    pub fn gated() -> Self {
        Self { gate: Some(Arc::new(Semaphore::new(0))), ..Self::new() }
    }

    pub fn from_script(script: MockScript) -> Self {
        let mock = Self::new().with_history(script.history).with_replies(script.replies);
        match script.metadata {
            Some(metadata) => mock.with_metadata(metadata),
            None => mock,
        }
    }

    /// History served for every session without its own
    pub fn with_history(self, mut history: Vec<HistoryMessage>) -> Self {
        history.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        self.lock().default_history = history;
        self
    }

    pub fn with_session_history(self, session_id: impl Into<String>, mut history: Vec<HistoryMessage>) -> Self {
        history.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        self.lock().sessions.insert(session_id.into(), history);
        self
    }

    pub fn with_replies(self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        self.lock().replies.extend(replies);
        self
    }

    pub fn with_metadata(self, metadata: SessionMetadata) -> Self {
        self.lock().metadata = Some(metadata);
        self
    }

    /// Fail the next `n` history requests with a network error
    pub fn fail_next_history(&self, n: usize) {
        self.lock().history_failures = n;
    }

    /// Let `n` gated requests proceed
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn history_calls(&self) -> usize {
        self.lock().calls.iter().filter(|c| matches!(c, RecordedCall::History { .. })).count()
    }

    pub fn submit_calls(&self) -> usize {
        self.lock().calls.iter().filter(|c| matches!(c, RecordedCall::Submit { .. })).count()
    }

    /// Resolve once at least `n` calls have been recorded
    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.call_count.subscribe();
        let _ = rx.wait_for(|count| *count >= n).await;
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: RecordedCall) {
        let count = {
            let mut state = self.lock();
            state.calls.push(call);
            state.calls.len()
        };
        self.call_count.send_replace(count);
    }

    async fn pass_gate(&self) -> Result<()> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.map_err(|_| Error::Network("mock backend closed".to_string()))?.forget();
        }
        Ok(())
    }

    /// Store a delivered exchange so a later reload sees it
    fn persist_exchange(&self, session_id: &str, text: &str, reply: &str) {
        let mut state = self.lock();
        let mut history = state.history_for(session_id).to_vec();
        let now = Timestamp::now();
        history.push(HistoryMessage::new(Role::User, text, now.clone()));
        history.push(HistoryMessage::new(Role::Assistant, reply, now));
        state.sessions.insert(session_id.to_string(), history);
    }
}

#[async_trait::async_trait]
impl Backend for MockBackend {
    async fn fetch_history(
        &self, session_id: &str, limit: usize, before: Option<&Timestamp>,
    ) -> Result<Vec<HistoryMessage>> {
        self.record(RecordedCall::History { session_id: session_id.to_string(), limit, before: before.cloned() });
        self.pass_gate().await?;

        let mut state = self.lock();
        if state.history_failures > 0 {
            state.history_failures -= 1;
            return Err(Error::Network("mock history failure".to_string()));
        }

        let older = state
            .history_for(session_id)
            .iter()
            .filter(|m| before.is_none_or(|b| m.timestamp < *b))
            .cloned()
            .collect::<Vec<_>>();
        let start = older.len().saturating_sub(limit);
        Ok(older[start..].to_vec())
    }

    async fn submit_message(
        &self, session_id: &str, discipline_id: &str, text: &str, attachment: Option<&Attachment>,
    ) -> Result<String> {
        self.record(RecordedCall::Submit {
            session_id: session_id.to_string(),
            discipline_id: discipline_id.to_string(),
            text: text.to_string(),
            attachment: attachment.map(|a| a.file_name().to_string()),
        });
        self.pass_gate().await?;

        let reply = self.lock().replies.pop_front();
        match reply {
            Some(MockReply::Body { body }) => {
                self.persist_exchange(session_id, text, &body);
                Ok(body)
            }
            Some(MockReply::Failure { message }) => Err(Error::Network(message)),
            Some(MockReply::Status { status: 401, .. }) => Err(Error::Unauthorized),
            Some(MockReply::Status { status, body }) => Err(Error::backend(status, body)),
            None => {
                let body = "No more mock replies configured".to_string();
                self.persist_exchange(session_id, text, &body);
                Ok(body)
            }
        }
    }

    async fn fetch_session_metadata(&self, session_id: &str) -> Result<SessionMetadata> {
        self.record(RecordedCall::Metadata { session_id: session_id.to_string() });
        self.pass_gate().await?;

        self.lock()
            .metadata
            .clone()
            .ok_or_else(|| Error::backend(404, format!("no study session {}", session_id)))
    }
}

/// `count` alternating user/assistant messages one minute apart
pub fn generate_history(count: usize) -> Vec<HistoryMessage> {
    (0..count)
        .map(|i| {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            let at = Timestamp::from_epoch(HISTORY_EPOCH + 60.0 * i as f64).unwrap_or_else(Timestamp::now);
            HistoryMessage::new(role, format!("message {}", i), at)
        })
        .collect()
}

/// 2024-05-01T12:00:00Z
const HISTORY_EPOCH: f64 = 1_714_564_800.0;
