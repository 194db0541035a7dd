/// Controller operations a view reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LoadInitial,
    LoadMore,
    Send,
}

/// What the view does with its scroll position once an operation completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollDirective {
    /// Jump to the newest entry
    ToBottom,
    /// Keep the entry under the viewport's top edge where it was
    Preserve,
}

impl ScrollDirective {
    /// Directive for a completed operation, successful or not
    pub fn for_operation(operation: Operation) -> Self {
        match operation {
            Operation::LoadInitial | Operation::Send => ScrollDirective::ToBottom,
            Operation::LoadMore => ScrollDirective::Preserve,
        }
    }
}

/// Viewport offset bookkeeping for a line-oriented transcript view.
///
/// Offset 0 is the bottom; it grows as the reader scrolls towards older
/// entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollPosition {
    offset: usize,
}

impl ScrollPosition {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_at_bottom(&self) -> bool {
        self.offset == 0
    }

    pub fn scroll_up(&mut self, lines: usize, total: usize) {
        self.offset = self.offset.saturating_add(lines).min(total.saturating_sub(1));
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.offset = self.offset.saturating_sub(lines);
    }

    /// Whether the reader has reached the oldest entry (time to load more)
    pub fn is_at_top(&self, total: usize) -> bool {
        total == 0 || self.offset + 1 >= total
    }

    /// Apply a directive once the store has changed.
    ///
    /// `Preserve` follows a prepend: entries landed above the viewport, so the
    /// offset from the bottom already points at the same entry.
    pub fn apply(&mut self, directive: ScrollDirective) {
        match directive {
            ScrollDirective::ToBottom => self.offset = 0,
            ScrollDirective::Preserve => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy() {
        assert_eq!(ScrollDirective::for_operation(Operation::LoadInitial), ScrollDirective::ToBottom);
        assert_eq!(ScrollDirective::for_operation(Operation::Send), ScrollDirective::ToBottom);
        assert_eq!(ScrollDirective::for_operation(Operation::LoadMore), ScrollDirective::Preserve);
    }

    #[test]
    fn test_scroll_bounds() {
        let mut position = ScrollPosition::default();
        assert!(position.is_at_bottom());

        position.scroll_up(5, 3);
        assert_eq!(position.offset(), 2);
        assert!(position.is_at_top(3));

        position.scroll_down(10);
        assert!(position.is_at_bottom());
    }

    #[test]
    fn test_apply_directive() {
        let mut position = ScrollPosition::default();
        position.scroll_up(4, 20);

        position.apply(ScrollDirective::Preserve);
        assert_eq!(position.offset(), 4);

        position.apply(ScrollDirective::ToBottom);
        assert!(position.is_at_bottom());
    }
}
