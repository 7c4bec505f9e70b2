//! Apply an exam edit to one agenda row.

use exam_agenda_core::{ExamDetail, ExamDiff, ListingState, ReconciliationPlan, RowKey};
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::backend::AgendaBackend;
use crate::error::{ApiError, SyncError, SyncResult};

/// Pushes the difference between a row's exams and an edited list.
///
/// Additions go out one at a time before any removal, so the appointment
/// never holds zero exams on the backend. Removals then run concurrently.
pub struct ExamReconciler<'a, B: AgendaBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: AgendaBackend + ?Sized> ExamReconciler<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Reconcile `key` to `edited`. Only that row is patched, and only when
    /// every call succeeded.
    pub async fn apply(
        &self,
        listing: &mut ListingState,
        key: &RowKey,
        edited: Vec<ExamDetail>,
        unit_id: i64,
        cancel: &CancellationToken,
    ) -> SyncResult<ExamDiff> {
        let row = listing
            .row(key)
            .ok_or_else(|| SyncError::RowNotFound(key.clone()))?;
        let plan = ReconciliationPlan::new(row, edited)?;

        if plan.is_noop() {
            listing.replace_exams(key, plan.target);
            return Ok(plan.diff);
        }

        tracing::info!(
            row = %key,
            added = ?plan.diff.added_ids(),
            removed = ?plan.diff.removed_ids(),
            "Reconciling exams"
        );

        for exam in &plan.diff.added {
            if cancel.is_cancelled() {
                return Err(ApiError::Cancelled.into());
            }
            self.backend.add_exam(key, exam, unit_id).await?;
        }

        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled.into());
        }
        let removals = join_all(
            plan.diff
                .removed
                .iter()
                .map(|exam| self.backend.remove_exam(key, exam.exam_id)),
        )
        .await;
        if let Some(err) = removals.into_iter().find_map(Result::err) {
            tracing::warn!(row = %key, error = %err, "Exam removal failed");
            return Err(err.into());
        }

        listing.replace_exams(key, plan.target);
        Ok(plan.diff)
    }
}
