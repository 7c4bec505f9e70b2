//! Listing state: filtering, pagination and selection over loaded rows.
//!
//! Everything here is derived in memory from the rows of the last full load.
//! Single-row edits patch rows in place instead of reloading.

mod filter;
mod pagination;
mod selection;

pub use filter::*;
pub use pagination::*;
pub use selection::*;

use serde::{Deserialize, Serialize};

use crate::models::{AppointmentPatientRow, ExamDetail, RowKey, RowStatus};

/// Counts over every loaded row, ignoring the filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingStats {
    pub total: usize,
    pub sent: usize,
    /// Neither sent nor failed
    pub pending: usize,
    pub errors: usize,
}

/// Explicit, serializable listing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingState {
    rows: Vec<AppointmentPatientRow>,
    filter: ListingFilter,
    page: usize,
    page_size: usize,
    selection: Selection,
}

impl Default for ListingState {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ListingState {
    /// Create a new listing on page 1 with the default page size.
    pub fn new(rows: Vec<AppointmentPatientRow>) -> Self {
        Self {
            rows,
            filter: ListingFilter::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            selection: Selection::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Replace every row after a full reload. Selection and page reset.
    pub fn load(&mut self, rows: Vec<AppointmentPatientRow>) {
        self.rows = rows;
        self.selection.clear();
        self.page = 1;
    }

    pub fn rows(&self) -> &[AppointmentPatientRow] {
        &self.rows
    }

    pub fn row(&self, key: &RowKey) -> Option<&AppointmentPatientRow> {
        self.rows.iter().find(|r| r.key == *key)
    }

    fn row_mut(&mut self, key: &RowKey) -> Option<&mut AppointmentPatientRow> {
        self.rows.iter_mut().find(|r| r.key == *key)
    }

    // ---- filtering ----

    pub fn filter(&self) -> &ListingFilter {
        &self.filter
    }

    /// Apply a new filter and go back to page 1.
    pub fn set_filter(&mut self, filter: ListingFilter) {
        self.filter = filter;
        self.page = 1;
    }

    pub fn filtered(&self) -> Vec<&AppointmentPatientRow> {
        self.rows.iter().filter(|r| self.filter.matches(r)).collect()
    }

    // ---- pagination ----

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.filtered().len(), self.page_size)
    }

    pub fn page_rows(&self) -> Vec<&AppointmentPatientRow> {
        let filtered = self.filtered();
        let (start, end) = page_bounds(self.page, self.page_size, filtered.len());
        filtered[start..end].to_vec()
    }

    pub fn visible_pages(&self) -> Vec<usize> {
        visible_pages(self.page, self.total_pages())
    }

    /// Jump to a page; out-of-range requests are ignored.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if page >= 1 && page <= self.total_pages() {
            self.page = page;
            true
        } else {
            false
        }
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.page + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        self.page > 1 && self.go_to_page(self.page - 1)
    }

    fn clamp_page(&mut self) {
        self.page = self.page.clamp(1, self.total_pages());
    }

    // ---- selection ----

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_selected(&self, key: &RowKey) -> bool {
        self.selection.contains(key)
    }

    /// Toggle one row. Sent or unknown rows are ignored.
    pub fn toggle_selected(&mut self, key: &RowKey) -> bool {
        match self.rows.iter().find(|r| r.key == *key) {
            Some(row) => self.selection.toggle(row),
            None => false,
        }
    }

    /// Select every selectable row passing the filter (all pages).
    pub fn select_all_filtered(&mut self) {
        let Self {
            rows,
            filter,
            selection,
            ..
        } = self;
        for row in rows.iter().filter(|r| filter.matches(r)) {
            selection.select(row);
        }
    }

    /// Deselect every row passing the filter; selections hidden by the filter stay.
    pub fn deselect_all_filtered(&mut self) {
        let Self {
            rows,
            filter,
            selection,
            ..
        } = self;
        for row in rows.iter().filter(|r| filter.matches(r)) {
            selection.deselect(&row.key);
        }
    }

    /// True when every selectable filtered row is selected (and there is one).
    pub fn all_filtered_selected(&self) -> bool {
        let mut selectable = self
            .filtered()
            .into_iter()
            .filter(|r| r.is_selectable())
            .peekable();
        selectable.peek().is_some() && selectable.all(|r| self.selection.contains(&r.key))
    }

    pub fn toggle_all_filtered(&mut self) {
        if self.all_filtered_selected() {
            self.deselect_all_filtered();
        } else {
            self.select_all_filtered();
        }
    }

    pub fn selected_keys(&self) -> Vec<RowKey> {
        self.selection.keys().cloned().collect()
    }

    pub fn selected_rows(&self) -> Vec<&AppointmentPatientRow> {
        self.rows
            .iter()
            .filter(|r| self.selection.contains(&r.key))
            .collect()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ---- stats & patches ----

    pub fn statistics(&self) -> ListingStats {
        let mut stats = ListingStats {
            total: self.rows.len(),
            ..Default::default()
        };
        for row in &self.rows {
            match row.status {
                Some(RowStatus::Sent) => stats.sent += 1,
                Some(RowStatus::Error) => stats.errors += 1,
                _ => stats.pending += 1,
            }
        }
        stats
    }

    /// Patch one row's exams after a successful reconciliation.
    pub fn replace_exams(&mut self, key: &RowKey, exams: Vec<ExamDetail>) -> bool {
        match self.row_mut(key) {
            Some(row) => {
                row.exams = exams;
                true
            }
            None => false,
        }
    }

    /// Drop rows after a soft delete. Returns how many were removed.
    pub fn remove_rows(&mut self, keys: &[RowKey]) -> usize {
        let before = self.rows.len();
        self.rows.retain(|r| !keys.contains(&r.key));
        for key in keys {
            self.selection.deselect(key);
        }
        self.clamp_page();
        before - self.rows.len()
    }

    /// Set the status of the given rows. Sent rows become read-only and leave
    /// the selection.
    pub fn set_status(&mut self, keys: &[RowKey], status: RowStatus) {
        for key in keys {
            let Some(row) = self.row_mut(key) else {
                continue;
            };
            if status == RowStatus::Sent {
                row.mark_sent();
                self.selection.deselect(key);
            } else {
                row.status = Some(status);
            }
        }
    }
}
