mod history;
mod send;

use std::sync::{Arc, Mutex, MutexGuard};
use studychat_client::Backend;
use studychat_core::{AttachmentInfo, Message, PrivacyConfig, SessionContext, Timestamp};

use crate::cursor::PaginationCursor;
use crate::store::MessageStore;

/// Assistant notice appended when a send fails
pub const SEND_FAILURE_NOTICE: &str = "An error occurred. Please try again later.";

/// Greeting seeded into an empty transcript
pub fn greeting(session_id: &str) -> String {
    format!("Welcome to session {}! How can I help you today?", session_id)
}

/// The one operation a controller may have in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    LoadingInitial,
    LoadingMore,
    Sending,
}

/// Stamp carried across the network boundary; stale once the generation moves on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    generation: u64,
}

#[derive(Debug, Default)]
pub(crate) struct ControllerState {
    session: Option<SessionContext>,
    store: MessageStore,
    cursor: PaginationCursor,
    phase: Phase,
    generation: u64,
    pending_attachment: Option<AttachmentInfo>,
    closed: bool,
}

impl ControllerState {
    fn ticket(&self) -> Ticket {
        Ticket { generation: self.generation }
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        !self.closed && self.generation == ticket.generation
    }

    /// Start over for a different session; outstanding requests go stale
    fn switch_to(&mut self, session: SessionContext) {
        self.generation += 1;
        self.session = Some(session);
        self.store.clear();
        self.cursor = PaginationCursor::exhausted();
        self.phase = Phase::Idle;
        self.pending_attachment = None;
    }
}

/// Keeps one session's transcript consistent with the backend.
///
/// Shared by reference between a view's event handlers. State sits behind a
/// mutex that is only held for the synchronous transitions on either side of
/// a request, so concurrent calls serialise the way UI callbacks do: a second
/// `send` while sending or a second `load_more` while loading is refused
/// without touching the network.
pub struct TranscriptController {
    backend: Arc<dyn Backend>,
    state: Mutex<ControllerState>,
    privacy: PrivacyConfig,
}

impl TranscriptController {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend, state: Mutex::new(ControllerState::default()), privacy: PrivacyConfig::default() }
    }

    /// How message bodies appear in this controller's log events
    pub fn with_privacy(mut self, privacy: PrivacyConfig) -> Self {
        self.privacy = privacy;
        self
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Tear down the view: in-flight answers are dropped and further calls are skipped
    pub fn close(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.closed = true;
        state.phase = Phase::Idle;
        state.pending_attachment = None;
        tracing::debug!(generation = state.generation, "transcript closed");
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn session(&self) -> Option<SessionContext> {
        self.lock().session.clone()
    }

    /// Snapshot of the transcript, oldest first
    pub fn messages(&self) -> Vec<Message> {
        self.lock().store.to_vec()
    }

    pub fn len(&self) -> usize {
        self.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().store.is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.lock().cursor.has_more()
    }

    pub fn oldest_loaded(&self) -> Option<Timestamp> {
        self.lock().cursor.oldest_loaded().cloned()
    }

    /// The attachment of the send in flight, if any
    pub fn pending_attachment(&self) -> Option<AttachmentInfo> {
        self.lock().pending_attachment.clone()
    }
}
