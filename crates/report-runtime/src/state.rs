//! Immutable view state and request sequencing.

use report_core::{Granularity, TimeFilter};
use report_pipeline::{PageWindow, DEFAULT_PAGE_SIZE};
use serde::Serialize;

/// What the user is looking at. Replaced wholesale, never mutated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ViewState {
    pub granularity: Granularity,
    pub filter: TimeFilter,
    pub page: u32,
    pub page_size: usize,
}

impl ViewState {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            filter: TimeFilter::all(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        Self { page_size, ..self }
    }

    /// Switch views. Selections the new view ignores are dropped and the
    /// page resets.
    pub fn with_granularity(self, granularity: Granularity) -> Self {
        let mut filter = self.filter;
        if !granularity.supports_week_filter() {
            filter.week = None;
        }
        if !granularity.supports_day_filter() {
            filter.day = None;
        }
        Self {
            granularity,
            filter,
            page: 1,
            ..self
        }
    }

    /// A new filter always starts on page 1.
    pub fn with_filter(self, filter: TimeFilter) -> Self {
        Self {
            filter,
            page: 1,
            ..self
        }
    }

    pub fn with_page(self, page: u32) -> Self {
        Self { page, ..self }
    }

    /// The following page, if `window` has one.
    pub fn next_page(self, window: &PageWindow) -> Option<Self> {
        window.has_next().then(|| self.with_page(self.page + 1))
    }

    pub fn previous_page(self) -> Option<Self> {
        (self.page > 1).then(|| self.with_page(self.page - 1))
    }

    /// Back to page 1 when the page lies beyond `window`.
    pub fn clamped_to(self, window: &PageWindow) -> Self {
        if (1..=window.display_pages()).contains(&self.page) {
            self
        } else {
            self.with_page(1)
        }
    }
}

/// Monotonic identifier of one fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Hands out request tokens and decides which responses may be applied.
///
/// Only the response to the most recently issued token is current. Issuing
/// a new token, or invalidating, makes every earlier one stale.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    issued: u64,
}

impl RequestSequencer {
    pub fn issue(&mut self) -> RequestToken {
        self.issued += 1;
        RequestToken(self.issued)
    }

    /// Make every outstanding token stale without issuing a new one.
    pub fn invalidate(&mut self) {
        self.issued += 1;
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.issued
    }
}
