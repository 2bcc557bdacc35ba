//! Fixed-size page windows.

use serde::Serialize;
use std::ops::Range;

/// Rows per page in the detail views.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Geometry of one page over a sequence.
///
/// `total_pages` is the exact page count and is zero for an empty set;
/// [`PageWindow::display_pages`] is what a page indicator shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub page: u32,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: u32,
}

impl PageWindow {
    pub fn new(page: u32, page_size: usize, total_items: usize) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            u32::try_from(total_items.div_ceil(page_size)).unwrap_or(u32::MAX)
        };
        Self {
            page,
            page_size,
            total_items,
            total_pages,
        }
    }

    /// Page count for display: an empty set still shows one page.
    pub fn display_pages(&self) -> u32 {
        self.total_pages.max(1)
    }

    /// Whether `page` lies in `1..=display_pages()`.
    pub fn in_range(&self) -> bool {
        (1..=self.display_pages()).contains(&self.page)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.display_pages()
    }

    /// Index range of the page, clamped to the available items.
    pub fn range(&self) -> Range<usize> {
        let start = (self.page.saturating_sub(1) as usize)
            .saturating_mul(self.page_size)
            .min(self.total_items);
        let end = start.saturating_add(self.page_size).min(self.total_items);
        start..end
    }
}

/// A page of items together with its geometry.
#[derive(Debug, PartialEq)]
pub struct Page<'a, T> {
    pub window: PageWindow,
    pub items: &'a [T],
}

/// Window `items` to page `page` (1-based). The page number is not clamped;
/// a page past the end yields an empty slice.
pub fn paginate<T>(items: &[T], page: u32, page_size: usize) -> Page<'_, T> {
    let window = PageWindow::new(page, page_size, items.len());
    Page {
        window,
        items: &items[window.range()],
    }
}
