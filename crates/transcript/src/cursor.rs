use studychat_core::Timestamp;

/// Where the next older page starts and whether one may exist
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationCursor {
    oldest_loaded: Option<Timestamp>,
    has_more: bool,
}

impl PaginationCursor {
    /// Cursor after a first page of `count` messages requested with `page_size`
    pub fn start(oldest: Option<Timestamp>, count: usize, page_size: usize) -> Self {
        let has_more = oldest.is_some() && page_is_full(count, page_size);
        Self { oldest_loaded: oldest, has_more }
    }

    /// Nothing older to fetch (empty or seeded transcript)
    pub fn exhausted() -> Self {
        Self::default()
    }

    /// Move past a prepended page; an empty page keeps the old bound
    pub fn advance(&mut self, oldest: Option<Timestamp>, count: usize, page_size: usize) {
        if let Some(oldest) = oldest {
            self.oldest_loaded = Some(oldest);
        }
        self.has_more = page_is_full(count, page_size);
    }

    pub fn oldest_loaded(&self) -> Option<&Timestamp> {
        self.oldest_loaded.as_ref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// The `before` bound for the next page, if another page may exist
    pub fn next_before(&self) -> Option<&Timestamp> {
        if self.has_more { self.oldest_loaded.as_ref() } else { None }
    }
}

/// A short page means the backend ran out of history
pub fn page_is_full(count: usize, page_size: usize) -> bool {
    count >= page_size.max(1)
}
