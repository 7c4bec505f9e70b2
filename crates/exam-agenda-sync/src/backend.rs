//! Seam between the workflows and the REST backend.

use async_trait::async_trait;
use exam_agenda_core::dto::{
    AgendaDetailDto, ExamCatalogDto, ImportCompleteRequest, ImportCompleteResponse,
    PendingResponse, ProfileDto, ProfileExamDto,
};
use exam_agenda_core::{ExamDetail, RowKey};

use crate::error::ApiResult;

/// Operations the agenda workflows need from the backend.
///
/// Payloads are already normalized DTOs; implementations own transport,
/// authentication and envelope unwrapping.
#[async_trait]
pub trait AgendaBackend: Send + Sync {
    /// Consolidated patient, appointment and exam rows. `None` loads every unit.
    async fn agenda_details(&self, unit_id: Option<i64>) -> ApiResult<Vec<AgendaDetailDto>>;

    /// One catalog entry. `Ok(None)` when the backend has no such exam.
    async fn exam_by_id(&self, exam_id: i64) -> ApiResult<Option<ExamCatalogDto>>;

    async fn profiles(&self) -> ApiResult<Vec<ProfileDto>>;

    async fn profile_exams(&self, group_id: i64) -> ApiResult<Vec<ProfileExamDto>>;

    async fn search_exams(&self, term: &str, limit: usize) -> ApiResult<Vec<ExamCatalogDto>>;

    /// Create patient, appointment and profile exams for one roster row.
    async fn import_patient_complete(
        &self,
        request: &ImportCompleteRequest,
    ) -> ApiResult<ImportCompleteResponse>;

    async fn add_exam(&self, key: &RowKey, exam: &ExamDetail, unit_id: i64) -> ApiResult<()>;

    async fn remove_exam(&self, key: &RowKey, exam_id: i64) -> ApiResult<()>;

    /// Soft delete every agenda row of the given patients.
    async fn remove_by_cpf(&self, cpfs: &[String]) -> ApiResult<()>;

    /// Soft delete specific (appointment, patient) rows.
    async fn remove_by_appointment(&self, keys: &[RowKey]) -> ApiResult<()>;

    /// Push pending rows of the given patients to the lab system.
    async fn process_pending(&self, cpfs: &[String]) -> ApiResult<PendingResponse>;
}
