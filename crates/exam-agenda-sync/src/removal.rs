//! Soft delete of listing rows.

use std::collections::HashSet;

use exam_agenda_core::{ListingState, RowKey};

use crate::backend::AgendaBackend;
use crate::error::{SyncError, SyncResult};

/// How a soft delete addresses the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalMode {
    /// Every agenda row of the selected patients.
    ByCpf,
    /// Only the selected (appointment, patient) rows.
    ByAppointment,
}

pub struct RowRemover<'a, B: AgendaBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: AgendaBackend + ?Sized> RowRemover<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Soft delete the selection, then drop the affected rows locally.
    /// Returns how many rows left the listing.
    pub async fn remove_selected(
        &self,
        listing: &mut ListingState,
        mode: RemovalMode,
    ) -> SyncResult<usize> {
        let selected = listing.selected_keys();
        if selected.is_empty() {
            return Err(SyncError::NothingSelected);
        }

        let doomed: Vec<RowKey> = match mode {
            RemovalMode::ByCpf => {
                let mut cpfs: Vec<String> = Vec::new();
                for key in &selected {
                    if !cpfs.contains(&key.cpf) {
                        cpfs.push(key.cpf.clone());
                    }
                }
                self.backend.remove_by_cpf(&cpfs).await?;
                let cpfs: HashSet<&str> = cpfs.iter().map(String::as_str).collect();
                listing
                    .rows()
                    .iter()
                    .filter(|r| cpfs.contains(r.cpf()))
                    .map(|r| r.key.clone())
                    .collect()
            }
            RemovalMode::ByAppointment => {
                self.backend.remove_by_appointment(&selected).await?;
                selected
            }
        };

        let removed = listing.remove_rows(&doomed);
        tracing::info!(mode = ?mode, removed, "Rows removed");
        Ok(removed)
    }
}
