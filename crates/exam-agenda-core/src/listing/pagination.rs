//! Page arithmetic.

/// Rows per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Number of page links shown at once.
pub const PAGE_WINDOW: usize = 5;

/// Total pages for `items` rows; never less than 1.
pub fn total_pages(items: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    items.div_ceil(page_size).max(1)
}

/// `[start, end)` indices of a 1-based page, clamped to `items`.
pub fn page_bounds(page: usize, page_size: usize, items: usize) -> (usize, usize) {
    let start = page.saturating_sub(1).saturating_mul(page_size).min(items);
    let end = start.saturating_add(page_size).min(items);
    (start, end)
}

/// Up to five page numbers around `current`, clamped to `1..=total`.
///
/// Near either edge the window slides so five numbers stay visible when
/// there are at least five pages.
pub fn visible_pages(current: usize, total: usize) -> Vec<usize> {
    let total = total.max(1);
    let current = current.clamp(1, total);
    let half = PAGE_WINDOW / 2;

    let mut start = current.saturating_sub(half).max(1);
    let mut end = (current + half).min(total);

    if end - start < PAGE_WINDOW - 1 {
        if start == 1 {
            end = (start + PAGE_WINDOW - 1).min(total);
        } else if end == total {
            start = end.saturating_sub(PAGE_WINDOW - 1).max(1);
        }
    }

    (start..=end).collect()
}
