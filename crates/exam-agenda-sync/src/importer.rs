//! Batch import of a previewed roster.

use exam_agenda_core::dto::ImportCompleteRequest;
use exam_agenda_core::{
    ImportJob, ImportSession, ImportSummary, PatientImportRecord, RowImportResult,
};
use futures_util::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::backend::AgendaBackend;
use crate::error::{ApiError, SyncResult};

/// Requests in flight at once.
pub const DEFAULT_IMPORT_CONCURRENCY: usize = 4;

/// Sends one complete-import request per roster row.
pub struct BatchImporter<'a, B: AgendaBackend + ?Sized> {
    backend: &'a B,
    concurrency: usize,
}

impl<'a, B: AgendaBackend + ?Sized> BatchImporter<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            concurrency: DEFAULT_IMPORT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Import every record. Results keep roster order; a failed row never
    /// stops its siblings and rows already imported stay imported.
    pub async fn run(
        &self,
        records: &[PatientImportRecord],
        appointment_date: &str,
        group_id: i64,
        unit_id: i64,
        cancel: &CancellationToken,
    ) -> ImportSummary {
        let outcomes = self
            .import_rows(records, appointment_date, group_id, unit_id, cancel)
            .await;
        ImportSummary::from_results(outcomes.into_iter().map(|(result, _)| result).collect())
    }

    /// Import a job handed out by the session.
    pub async fn run_job(&self, job: &ImportJob, cancel: &CancellationToken) -> ImportSummary {
        self.run(
            &job.records,
            &job.appointment_date,
            job.group_id,
            job.unit_id,
            cancel,
        )
        .await
    }

    /// Drive a previewing session through the import and into its result
    /// state. When no row could reach the backend at all, the session fails
    /// as a whole with the connection message.
    pub async fn run_session(
        &self,
        session: &mut ImportSession,
        user_unit: Option<i64>,
        known_units: &[i64],
        cancel: &CancellationToken,
    ) -> SyncResult<ImportSummary> {
        let job = session.start_import(user_unit, known_units)?;
        tracing::info!(
            session_id = %job.session_id,
            rows = job.records.len(),
            group_id = job.group_id,
            unit_id = job.unit_id,
            date = %job.appointment_date,
            "Starting batch import"
        );

        let outcomes = self
            .import_rows(
                &job.records,
                &job.appointment_date,
                job.group_id,
                job.unit_id,
                cancel,
            )
            .await;

        let unreachable = outcomes
            .iter()
            .all(|(_, err)| matches!(err, Some(ApiError::Connection(_))));
        if unreachable {
            if let Some((_, Some(err))) = outcomes.first() {
                let message = err.user_message();
                tracing::warn!(session_id = %job.session_id, error = %err, "Backend unreachable, import failed");
                session.fail(&message)?;
                let summary = ImportSummary::failed_all(&job.records, &message);
                return Ok(summary);
            }
        }

        let summary =
            ImportSummary::from_results(outcomes.into_iter().map(|(result, _)| result).collect());
        tracing::info!(
            session_id = %job.session_id,
            successes = summary.successes,
            errors = summary.errors,
            exams = summary.total_exams,
            "Batch import finished"
        );
        session.finish(summary.clone())?;
        Ok(summary)
    }

    async fn import_rows(
        &self,
        records: &[PatientImportRecord],
        appointment_date: &str,
        group_id: i64,
        unit_id: i64,
        cancel: &CancellationToken,
    ) -> Vec<(RowImportResult, Option<ApiError>)> {
        stream::iter(records)
            .map(|record| async move {
                // Checked when the row is about to be issued; in-flight rows finish.
                if cancel.is_cancelled() {
                    return (
                        RowImportResult::failed(record, ApiError::Cancelled.user_message()),
                        Some(ApiError::Cancelled),
                    );
                }
                let request =
                    ImportCompleteRequest::from_record(record, appointment_date, group_id, unit_id);
                match self.backend.import_patient_complete(&request).await {
                    Ok(response) => (
                        RowImportResult::succeeded(
                            record,
                            response.patient_id,
                            response.appointment_id,
                            response.exam_count(),
                        ),
                        None,
                    ),
                    Err(e) => {
                        tracing::warn!(line = record.line_number, error = %e, "Row import failed");
                        (RowImportResult::failed(record, e.user_message()), Some(e))
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
