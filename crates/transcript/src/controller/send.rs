use studychat_client::decode_reply;
use studychat_core::{Attachment, EchoState, Message, redact_body};

use super::{Phase, SEND_FAILURE_NOTICE, TranscriptController};
use crate::outcome::{Outcome, Status};
use crate::scroll::Operation;

impl TranscriptController {
    /// Send a user message with an optional file.
    ///
    /// The echo is in the transcript before the request leaves. It is never
    /// removed: delivery marks it `Delivered` and appends the reply, failure
    /// marks it `Failed` and appends a notice.
    pub async fn send(&self, text: &str, attachment: Option<Attachment>) -> Outcome {
        let op = Operation::Send;
        if text.trim().is_empty() && attachment.is_none() {
            return Outcome::new(op, Status::Skipped);
        }

        let (ticket, session, echo_index) = {
            let mut state = self.lock();
            if state.closed {
                return Outcome::new(op, Status::Skipped);
            }
            let Some(session) = state.session.clone() else {
                return Outcome::new(op, Status::Skipped);
            };
            if state.phase != Phase::Idle {
                tracing::debug!(phase = ?state.phase, "send refused while busy");
                return Outcome::new(op, Status::Busy);
            }

            let info = attachment.as_ref().map(Attachment::info);
            if let Err(e) = state.store.append(Message::echo(text, info.clone())) {
                return Outcome::failed(op, e.into(), 0);
            }

            state.phase = Phase::Sending;
            state.pending_attachment = info;
            (state.ticket(), session, state.store.len() - 1)
        };

        tracing::debug!(
            %session,
            text = %redact_body(text, &self.privacy),
            attachment = attachment.as_ref().map(Attachment::file_name),
            "sending message"
        );
        let result =
            self.backend.submit_message(&session.session_id, &session.discipline_id, text, attachment.as_ref()).await;

        let mut state = self.lock();
        if !state.is_current(ticket) {
            tracing::debug!(%session, "dropping stale send result");
            return Outcome::new(op, Status::Stale);
        }
        state.phase = Phase::Idle;
        state.pending_attachment = None;

        let (echo_state, entry, outcome) = match result {
            Ok(raw) => {
                let content = decode_reply(&raw);
                tracing::debug!(%session, reply = %redact_body(content.text(), &self.privacy), "reply received");
                (EchoState::Delivered, Message::reply(content), Outcome::completed(op, 2))
            }
            Err(e) => {
                tracing::error!(%session, error = %e, "failed to send message");
                (EchoState::Failed, Message::synthetic(SEND_FAILURE_NOTICE), Outcome::failed(op, e, 2))
            }
        };

        match state.store.get_mut(echo_index) {
            Some(echo) if echo.is_pending() => {
                echo.set_echo_state(echo_state);
            }
            _ => tracing::warn!(%session, echo_index, "optimistic echo moved before reconciliation"),
        }

        if let Err(e) = state.store.append(entry) {
            return Outcome::failed(op, e.into(), 1);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use studychat_client::{MockBackend, MockReply};
    use studychat_core::{Origin, SessionContext};

    async fn ready_controller(mock: Arc<MockBackend>) -> TranscriptController {
        let controller = TranscriptController::new(mock);
        controller.load_initial(SessionContext::new("5", "2"), 10).await;
        controller
    }

    #[tokio::test]
    async fn test_send_without_session_is_skipped() {
        let mock = Arc::new(MockBackend::new());
        let controller = TranscriptController::new(mock.clone());
        assert_eq!(controller.send("hello", None).await.status, Status::Skipped);
        assert_eq!(mock.submit_calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_send_is_skipped() {
        let mock = Arc::new(MockBackend::new());
        let controller = ready_controller(mock.clone()).await;

        assert_eq!(controller.send("   \n", None).await.status, Status::Skipped);
        assert_eq!(mock.submit_calls(), 0);
        assert_eq!(controller.len(), 1);
    }

    #[tokio::test]
    async fn test_attachment_without_text_is_sent() {
        let mock = Arc::new(MockBackend::new().with_replies([MockReply::body("got it")]));
        let controller = ready_controller(mock.clone()).await;

        let attachment = Attachment::from_bytes("chart.png", vec![1u8, 2]).unwrap();
        let outcome = controller.send("", Some(attachment)).await;
        assert!(outcome.is_completed());

        let messages = controller.messages();
        let echo = &messages[messages.len() - 2];
        assert_eq!(echo.text(), "");
        assert_eq!(echo.attachment.as_ref().map(|a| a.file_name.as_str()), Some("chart.png"));
        assert_eq!(echo.echo_state(), Some(EchoState::Delivered));
        assert!(controller.pending_attachment().is_none());
    }

    #[tokio::test]
    async fn test_reply_is_decoded() {
        let body = r#"{"type":"multimodal","content":"see the graph","image":"https://cdn/g.png"}"#;
        let mock = Arc::new(MockBackend::new().with_replies([MockReply::body(body)]));
        let controller = ready_controller(mock).await;

        controller.send("plot it", None).await;
        let reply = controller.messages().pop().unwrap();
        assert_eq!(reply.origin, Origin::Reply);
        assert_eq!(reply.text(), "see the graph");
        assert_eq!(reply.image(), Some("https://cdn/g.png"));
    }

    #[tokio::test]
    async fn test_unauthorized_send_reports_reason() {
        let mock = Arc::new(MockBackend::new().with_replies([MockReply::Status { status: 401, body: String::new() }]));
        let controller = ready_controller(mock).await;

        let outcome = controller.send("hello", None).await;
        assert_eq!(outcome.failure(), Some("session expired, please log in again"));
        assert_eq!(controller.messages().pop().unwrap().text(), SEND_FAILURE_NOTICE);
    }
}
