use studychat_core::Error;

use crate::scroll::{Operation, ScrollDirective};

/// How a controller call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// The backend answered and the store was updated
    Completed,
    /// The backend failed; the reason is for display only
    Failed(String),
    /// Nothing to do (no session, nothing older, blank input, closed)
    Skipped,
    /// Another operation is in flight; no request was issued
    Busy,
    /// The answer arrived after a session switch or close and was dropped
    Stale,
}

/// Result of a controller operation as seen by the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub operation: Operation,
    pub status: Status,
    /// Entries added to the store
    pub added: usize,
}

impl Outcome {
    pub(crate) fn new(operation: Operation, status: Status) -> Self {
        Self { operation, status, added: 0 }
    }

    pub(crate) fn completed(operation: Operation, added: usize) -> Self {
        Self { operation, status: Status::Completed, added }
    }

    pub(crate) fn failed(operation: Operation, error: Error, added: usize) -> Self {
        Self { operation, status: Status::Failed(error.to_string()), added }
    }

    /// Scroll directive for the view; `None` when the store did not change
    pub fn scroll(&self) -> Option<ScrollDirective> {
        match self.status {
            Status::Completed | Status::Failed(_) => Some(ScrollDirective::for_operation(self.operation)),
            Status::Skipped | Status::Busy | Status::Stale => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    pub fn is_busy(&self) -> bool {
        self.status == Status::Busy
    }

    pub fn failure(&self) -> Option<&str> {
        match &self.status {
            Status::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studychat_core::StoreError;

    #[test]
    fn test_scroll_follows_operation() {
        assert_eq!(Outcome::completed(Operation::LoadMore, 10).scroll(), Some(ScrollDirective::Preserve));
        let down = || Error::Network("down".to_string());
        assert_eq!(Outcome::failed(Operation::Send, down(), 1).scroll(), Some(ScrollDirective::ToBottom));
        assert_eq!(Outcome::failed(Operation::LoadInitial, down(), 0).scroll(), Some(ScrollDirective::ToBottom));
    }

    #[test]
    fn test_no_scroll_without_change() {
        for status in [Status::Skipped, Status::Busy, Status::Stale] {
            assert_eq!(Outcome::new(Operation::Send, status).scroll(), None);
        }
    }

    #[test]
    fn test_failure_reason() {
        let outcome = Outcome::failed(Operation::LoadMore, Error::Network("refused".to_string()), 0);
        assert_eq!(outcome.failure(), Some("network error: refused"));

        let rejected = Outcome::failed(Operation::LoadMore, StoreError::UnorderedBatch("overlap".to_string()).into(), 0);
        assert!(rejected.failure().is_some_and(|reason| reason.starts_with("store error:")));
        assert!(!outcome.is_completed());
        assert!(Outcome::new(Operation::Send, Status::Busy).is_busy());
    }
}
