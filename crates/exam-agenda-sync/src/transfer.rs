//! Push pending rows to the lab system.

use std::collections::HashMap;

use exam_agenda_core::{ListingState, RowKey, RowStatus};

use crate::backend::AgendaBackend;
use crate::error::{SyncError, SyncResult};

/// Outcome of a transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub sent: usize,
    pub failed: usize,
    pub message: Option<String>,
}

pub struct PendingTransfer<'a, B: AgendaBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: AgendaBackend + ?Sized> PendingTransfer<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Transfer the selected rows.
    pub async fn run_selected(&self, listing: &mut ListingState) -> SyncResult<TransferReport> {
        let keys = listing.selected_keys();
        self.run(listing, &keys).await
    }

    /// Transfer `keys`. Rows already sent or no longer loaded are skipped.
    ///
    /// Per-CPF results apply to every listed row of that patient. A response
    /// without per-CPF results applies its overall flag to all rows. A
    /// transport error marks every row as failed and keeps the selection.
    pub async fn run(&self, listing: &mut ListingState, keys: &[RowKey]) -> SyncResult<TransferReport> {
        let keys: Vec<RowKey> = keys
            .iter()
            .filter(|k| listing.row(k).is_some_and(|r| !r.is_sent()))
            .cloned()
            .collect();
        if keys.is_empty() {
            return Err(SyncError::NothingSelected);
        }

        let mut cpfs: Vec<String> = Vec::new();
        for key in &keys {
            if !cpfs.contains(&key.cpf) {
                cpfs.push(key.cpf.clone());
            }
        }

        listing.set_status(&keys, RowStatus::Pending);
        tracing::info!(rows = keys.len(), patients = cpfs.len(), "Transferring pending rows");

        let response = match self.backend.process_pending(&cpfs).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Transfer failed");
                listing.set_status(&keys, RowStatus::Error);
                return Err(e.into());
            }
        };

        let mut report = TransferReport {
            message: response.mensagem.clone(),
            ..TransferReport::default()
        };

        match response.resultados.filter(|r| !r.is_empty()) {
            Some(results) => {
                let by_cpf: HashMap<&str, bool> = results
                    .iter()
                    .map(|r| (r.cpf.as_str(), r.delivered()))
                    .collect();
                let (sent, failed): (Vec<RowKey>, Vec<RowKey>) = keys
                    .into_iter()
                    .filter(|k| by_cpf.contains_key(k.cpf.as_str()))
                    .partition(|k| by_cpf.get(k.cpf.as_str()).copied().unwrap_or(false));
                report.sent = sent.len();
                report.failed = failed.len();
                listing.set_status(&sent, RowStatus::Sent);
                listing.set_status(&failed, RowStatus::Error);
            }
            None => {
                if response.sucesso {
                    report.sent = keys.len();
                    listing.set_status(&keys, RowStatus::Sent);
                } else {
                    report.failed = keys.len();
                    listing.set_status(&keys, RowStatus::Error);
                }
            }
        }

        listing.clear_selection();
        tracing::info!(sent = report.sent, failed = report.failed, "Transfer finished");
        Ok(report)
    }
}
