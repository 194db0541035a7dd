use studychat_client::HistoryMessage;
use studychat_core::{Message, SessionContext};

use super::{Phase, TranscriptController, greeting};
use crate::cursor::PaginationCursor;
use crate::outcome::{Outcome, Status};
use crate::scroll::Operation;

/// Stable sort by timestamp, then decode
fn into_ordered_messages(mut history: Vec<HistoryMessage>) -> Vec<Message> {
    history.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    history.into_iter().map(HistoryMessage::into_message).collect()
}

impl TranscriptController {
    /// Load the newest page of `session`.
    ///
    /// A different session than the active one is a switch: it always
    /// proceeds, clears the transcript and drops every outstanding answer.
    pub async fn load_initial(&self, session: SessionContext, page_size: usize) -> Outcome {
        let op = Operation::LoadInitial;
        let page_size = page_size.max(1);

        let ticket = {
            let mut state = self.lock();
            if state.closed {
                return Outcome::new(op, Status::Skipped);
            }

            if state.session.as_ref() != Some(&session) {
                tracing::debug!(%session, "switching transcript session");
                state.switch_to(session.clone());
            } else if state.phase != Phase::Idle {
                tracing::debug!(phase = ?state.phase, "initial load refused while busy");
                return Outcome::new(op, Status::Busy);
            }

            state.phase = Phase::LoadingInitial;
            state.ticket()
        };

        let result = self.backend.fetch_history(&session.session_id, page_size, None).await;

        let mut state = self.lock();
        if !state.is_current(ticket) {
            tracing::debug!(%session, "dropping stale initial history");
            return Outcome::new(op, Status::Stale);
        }
        state.phase = Phase::Idle;

        let history = match result {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(%session, error = %e, "failed to load chat history");
                return Outcome::failed(op, e, 0);
            }
        };

        if history.is_empty() {
            let seeded = state.store.replace_all(vec![Message::synthetic(greeting(&session.session_id))]);
            if let Err(e) = seeded {
                return Outcome::failed(op, e.into(), 0);
            }
            state.cursor = PaginationCursor::exhausted();
            tracing::debug!(%session, "empty history, seeded greeting");
            return Outcome::completed(op, 1);
        }

        let count = history.len();
        let messages = into_ordered_messages(history);
        let oldest = messages.iter().find_map(|m| m.timestamp.clone());

        if let Err(e) = state.store.replace_all(messages) {
            tracing::warn!(%session, error = %e, "rejected initial history page");
            return Outcome::failed(op, e.into(), 0);
        }
        state.cursor = PaginationCursor::start(oldest, count, page_size);

        tracing::debug!(%session, count, has_more = state.cursor.has_more(), "initial history loaded");
        Outcome::completed(op, count)
    }

    /// Fetch the page before the oldest loaded entry.
    ///
    /// No-op unless idle, bound to a session and more history may exist. A
    /// failure leaves `has_more` as it was so scrolling up again retries.
    pub async fn load_more(&self, page_size: usize) -> Outcome {
        let op = Operation::LoadMore;
        let page_size = page_size.max(1);

        let (ticket, session, before) = {
            let mut state = self.lock();
            if state.closed {
                return Outcome::new(op, Status::Skipped);
            }
            if state.phase != Phase::Idle {
                return Outcome::new(op, Status::Busy);
            }
            let Some(session) = state.session.clone() else {
                return Outcome::new(op, Status::Skipped);
            };
            let Some(before) = state.cursor.next_before().cloned() else {
                return Outcome::new(op, Status::Skipped);
            };

            state.phase = Phase::LoadingMore;
            (state.ticket(), session, before)
        };

        tracing::debug!(%session, before = %before, page_size, "loading older history");
        let result = self.backend.fetch_history(&session.session_id, page_size, Some(&before)).await;

        let mut state = self.lock();
        if !state.is_current(ticket) {
            tracing::debug!(%session, "dropping stale history page");
            return Outcome::new(op, Status::Stale);
        }
        state.phase = Phase::Idle;

        let history = match result {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(%session, error = %e, "failed to load older history");
                return Outcome::failed(op, e, 0);
            }
        };

        let count = history.len();
        let messages = into_ordered_messages(history);
        let oldest = messages.iter().find_map(|m| m.timestamp.clone());

        if let Err(e) = state.store.prepend(messages) {
            tracing::warn!(%session, error = %e, "rejected older history page");
            return Outcome::failed(op, e.into(), 0);
        }
        state.cursor.advance(oldest, count, page_size);

        tracing::debug!(%session, count, has_more = state.cursor.has_more(), "older history loaded");
        Outcome::completed(op, count)
    }
}
