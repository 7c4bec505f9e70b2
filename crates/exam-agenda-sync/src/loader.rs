//! Listing reload and catalog lookups.

use std::collections::HashMap;

use exam_agenda_core::dto::{build_rows, ExamCatalogDto};
use exam_agenda_core::{AppointmentPatientRow, ExamDetail, ExamProfile, ListingState};
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::backend::AgendaBackend;
use crate::config::DEFAULT_FETCH_BATCH;
use crate::error::{ApiError, ApiResult};

/// Result cap of the exam search box.
pub const SEARCH_LIMIT: usize = 10;

/// Loads the consolidated listing and the catalog data it references.
pub struct ListingLoader<'a, B: AgendaBackend + ?Sized> {
    backend: &'a B,
    fetch_batch: usize,
}

impl<'a, B: AgendaBackend + ?Sized> ListingLoader<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            fetch_batch: DEFAULT_FETCH_BATCH,
        }
    }

    pub fn with_fetch_batch(mut self, fetch_batch: usize) -> Self {
        self.fetch_batch = fetch_batch.max(1);
        self
    }

    /// Fetch and assemble every row visible to `unit_id`.
    pub async fn load(
        &self,
        unit_id: Option<i64>,
        cancel: &CancellationToken,
    ) -> ApiResult<Vec<AppointmentPatientRow>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(unit_id = ?unit_id, "Listing reload cancelled");
                Err(ApiError::Cancelled)
            }
            rows = self.load_rows(unit_id) => rows,
        }
    }

    /// Reload into an existing listing. Filter and page size survive.
    pub async fn reload(
        &self,
        listing: &mut ListingState,
        unit_id: Option<i64>,
        cancel: &CancellationToken,
    ) -> ApiResult<usize> {
        let rows = self.load(unit_id, cancel).await?;
        let count = rows.len();
        listing.load(rows);
        Ok(count)
    }

    async fn load_rows(&self, unit_id: Option<i64>) -> ApiResult<Vec<AppointmentPatientRow>> {
        let details = self.backend.agenda_details(unit_id).await?;

        let mut exam_ids: Vec<i64> = details.iter().filter_map(|d| d.exam_id).collect();
        exam_ids.sort_unstable();
        exam_ids.dedup();

        let catalog = self.fetch_catalog(&exam_ids).await;
        let rows = build_rows(&details, &catalog);
        tracing::info!(
            details = details.len(),
            exams = exam_ids.len(),
            catalog_hits = catalog.len(),
            rows = rows.len(),
            "Listing assembled"
        );
        Ok(rows)
    }

    /// Look up catalog entries, `fetch_batch` at a time. Failed lookups are
    /// skipped.
    pub async fn fetch_catalog(&self, exam_ids: &[i64]) -> HashMap<i64, ExamCatalogDto> {
        let mut catalog = HashMap::with_capacity(exam_ids.len());

        for chunk in exam_ids.chunks(self.fetch_batch) {
            let results = join_all(chunk.iter().map(|id| self.backend.exam_by_id(*id))).await;
            for (id, result) in chunk.iter().zip(results) {
                match result {
                    Ok(Some(dto)) => {
                        catalog.insert(*id, dto);
                    }
                    Ok(None) => tracing::debug!(exam_id = id, "Exam not in catalog"),
                    Err(e) => tracing::debug!(exam_id = id, error = %e, "Catalog lookup failed"),
                }
            }
        }

        catalog
    }

    /// Active profiles with their exam counts. A profile whose exam list
    /// fails to load reports 0 exams.
    pub async fn load_profiles(&self) -> ApiResult<Vec<ExamProfile>> {
        let profiles: Vec<ExamProfile> = self
            .backend
            .profiles()
            .await?
            .iter()
            .filter(|p| p.active)
            .filter_map(|p| p.to_profile())
            .collect();

        let counts = join_all(
            profiles
                .iter()
                .map(|p| self.backend.profile_exams(p.group_id)),
        )
        .await;

        Ok(profiles
            .into_iter()
            .zip(counts)
            .map(|(mut profile, exams)| {
                profile.exam_count = match exams {
                    Ok(exams) => exams.len(),
                    Err(e) => {
                        tracing::debug!(group_id = profile.group_id, error = %e, "Profile exams unavailable");
                        0
                    }
                };
                profile
            })
            .collect())
    }

    /// Catalog search for the exam editor.
    pub async fn search_exams(&self, term: &str) -> ApiResult<Vec<ExamDetail>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let found = self.backend.search_exams(term, SEARCH_LIMIT).await?;
        Ok(found.iter().filter_map(|dto| dto.to_exam_detail(None)).collect())
    }
}
