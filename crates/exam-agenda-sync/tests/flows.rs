//! Workflow tests against an in-memory backend that records every call.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use exam_agenda_core::dto::{
    AgendaDetailDto, ExamCatalogDto, ImportCompleteRequest, ImportCompleteResponse,
    PendingResponse, PendingResultDto, ProfileDto, ProfileExamDto,
};
use exam_agenda_core::{
    AppointmentPatientRow, DiabetesFlag, ExamDetail, ExamProfile, ImportSession, ListingState,
    PatientImportRecord, ReconcileError, RowKey, RowStatus, SourceFile,
};
use exam_agenda_sync::{
    AgendaBackend, ApiError, ApiResult, BatchImporter, CancellationToken, ExamReconciler,
    ListingLoader, PendingTransfer, RemovalMode, RowRemover, SyncError,
};

const CPF_ANA: &str = "52998224725";
const CPF_BRUNO: &str = "11144477735";

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Details(Option<i64>),
    ExamById(i64),
    Profiles,
    ProfileExams(i64),
    Search(String),
    Import(String),
    Add(RowKey, i64),
    Remove(RowKey, i64),
    RemoveByCpf(Vec<String>),
    RemoveByAppointment(Vec<RowKey>),
    Pending(Vec<String>),
}

#[derive(Default)]
struct RecordingBackend {
    calls: Mutex<Vec<Call>>,
    details: Vec<AgendaDetailDto>,
    catalog: HashMap<i64, ExamCatalogDto>,
    broken_lookups: HashSet<i64>,
    rejected_cpfs: HashSet<String>,
    unreachable: bool,
    broken_removals: HashSet<i64>,
    pending: Option<PendingResponse>,
    cancel_after_imports: Option<(usize, CancellationToken)>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    adds: InFlight,
    removals: InFlight,
}

/// Peak concurrency of one kind of call.
#[derive(Default)]
struct InFlight {
    now: AtomicUsize,
    max: AtomicUsize,
}

impl InFlight {
    async fn hold(&self) {
        let now = self.now.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.now.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

impl RecordingBackend {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn unreachable_error() -> ApiError {
        ApiError::Connection("http://agenda.test".into())
    }
}

#[async_trait]
impl AgendaBackend for RecordingBackend {
    async fn agenda_details(&self, unit_id: Option<i64>) -> ApiResult<Vec<AgendaDetailDto>> {
        self.record(Call::Details(unit_id));
        Ok(self.details.clone())
    }

    async fn exam_by_id(&self, exam_id: i64) -> ApiResult<Option<ExamCatalogDto>> {
        self.record(Call::ExamById(exam_id));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.broken_lookups.contains(&exam_id) {
            return Err(ApiError::Status {
                status: 500,
                body: String::new(),
            });
        }
        Ok(self.catalog.get(&exam_id).cloned())
    }

    async fn profiles(&self) -> ApiResult<Vec<ProfileDto>> {
        self.record(Call::Profiles);
        Ok(vec![
            ProfileDto {
                group_id: Some(10),
                name: "Rotina Hemodiálise".into(),
                active: true,
            },
            ProfileDto {
                group_id: Some(11),
                name: "Inativo".into(),
                active: false,
            },
            ProfileDto {
                group_id: Some(12),
                name: "Sem exames".into(),
                active: true,
            },
        ])
    }

    async fn profile_exams(&self, group_id: i64) -> ApiResult<Vec<ProfileExamDto>> {
        self.record(Call::ProfileExams(group_id));
        if group_id == 12 {
            return Err(Self::unreachable_error());
        }
        Ok((1..=3)
            .map(|id| ProfileExamDto { exam_id: Some(id) })
            .collect())
    }

    async fn search_exams(&self, term: &str, _limit: usize) -> ApiResult<Vec<ExamCatalogDto>> {
        self.record(Call::Search(term.to_string()));
        Ok(self
            .catalog
            .values()
            .filter(|dto| dto.description.to_lowercase().contains(&term.to_lowercase()))
            .cloned()
            .collect())
    }

    async fn import_patient_complete(
        &self,
        request: &ImportCompleteRequest,
    ) -> ApiResult<ImportCompleteResponse> {
        self.record(Call::Import(request.cpf_paciente.clone()));
        let imported = self
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Import(_)))
            .count();
        if let Some((after, token)) = &self.cancel_after_imports {
            if imported >= *after {
                token.cancel();
            }
        }

        if self.unreachable {
            return Err(Self::unreachable_error());
        }
        if self.rejected_cpfs.contains(&request.cpf_paciente) {
            return Err(ApiError::Rejected("Paciente já agendado nesta data".into()));
        }
        Ok(ImportCompleteResponse {
            sucesso: Some(true),
            mensagem: None,
            patient_id: Some(imported as i64),
            appointment_id: Some(100 + imported as i64),
            total_exams: Some(3),
        })
    }

    async fn add_exam(&self, key: &RowKey, exam: &ExamDetail, _unit_id: i64) -> ApiResult<()> {
        self.record(Call::Add(key.clone(), exam.exam_id));
        self.adds.hold().await;
        Ok(())
    }

    async fn remove_exam(&self, key: &RowKey, exam_id: i64) -> ApiResult<()> {
        self.record(Call::Remove(key.clone(), exam_id));
        self.removals.hold().await;
        if self.broken_removals.contains(&exam_id) {
            return Err(ApiError::Status {
                status: 404,
                body: "not found".into(),
            });
        }
        Ok(())
    }

    async fn remove_by_cpf(&self, cpfs: &[String]) -> ApiResult<()> {
        self.record(Call::RemoveByCpf(cpfs.to_vec()));
        Ok(())
    }

    async fn remove_by_appointment(&self, keys: &[RowKey]) -> ApiResult<()> {
        self.record(Call::RemoveByAppointment(keys.to_vec()));
        Ok(())
    }

    async fn process_pending(&self, cpfs: &[String]) -> ApiResult<PendingResponse> {
        self.record(Call::Pending(cpfs.to_vec()));
        match &self.pending {
            Some(response) => Ok(response.clone()),
            None => Err(Self::unreachable_error()),
        }
    }
}

fn exams(ids: &[i64]) -> Vec<ExamDetail> {
    ids.iter()
        .map(|id| ExamDetail::new(*id, format!("Exame {}", id)))
        .collect()
}

fn row(appointment_id: i64, cpf: &str, exam_ids: &[i64]) -> AppointmentPatientRow {
    let mut row = AppointmentPatientRow::new(RowKey::new(appointment_id, cpf), "Paciente");
    row.exams = exams(exam_ids);
    row.status = Some(RowStatus::Correct);
    row
}

fn three_row_listing() -> ListingState {
    ListingState::new(vec![
        row(1, CPF_ANA, &[1, 2, 3]),
        row(2, CPF_ANA, &[1]),
        row(3, CPF_BRUNO, &[1, 2]),
    ])
}

fn record(line: usize, name: &str, cpf: &str) -> PatientImportRecord {
    PatientImportRecord {
        line_number: line,
        name: name.into(),
        cpf: cpf.into(),
        gender: "F".into(),
        birth_date: "1975-06-30".into(),
        treatment_type: "Hemodiálise".into(),
        diabetes: DiabetesFlag::No,
        weight_kg: 70.0,
        height_m: 1.7,
    }
}

fn roster() -> Vec<PatientImportRecord> {
    vec![
        record(2, "Ana Souza", CPF_ANA),
        record(3, "Bruno Lima", CPF_BRUNO),
        record(4, "Carla Dias", "39053344705"),
        record(5, "Davi Reis", "86288366757"),
    ]
}

fn previewing_session(records: Vec<PatientImportRecord>) -> ImportSession {
    let mut session = ImportSession::new();
    session
        .select_file(SourceFile::fingerprint("roster.xlsx", b"roster"), records)
        .unwrap();
    session
        .begin_preview("2024-05-10", Some(ExamProfile::new(10, "Rotina Hemodiálise")))
        .unwrap();
    session
}

// ---------------------------------------------------------------------------
// Listing loader
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_catalog_fetched_in_batches_and_failures_ignored() {
    let details = (1..=45)
        .map(|id| AgendaDetailDto {
            appointment_id: Some(1),
            exam_id: Some(id),
            cpf: CPF_ANA.into(),
            name: "Ana Souza".into(),
            ..AgendaDetailDto::default()
        })
        .collect();
    let catalog = (1..=45)
        .filter(|id| *id != 7)
        .map(|id| {
            (
                id,
                ExamCatalogDto {
                    exam_id: Some(id),
                    description: format!("Catálogo {}", id),
                    ..ExamCatalogDto::default()
                },
            )
        })
        .collect();
    let backend = RecordingBackend {
        details,
        catalog,
        broken_lookups: HashSet::from([8]),
        ..RecordingBackend::default()
    };

    let rows = ListingLoader::new(&backend)
        .with_fetch_batch(20)
        .load(Some(3039), &CancellationToken::new())
        .await
        .unwrap();

    let lookups = backend
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::ExamById(_)))
        .count();
    assert_eq!(lookups, 45);
    assert_eq!(backend.max_in_flight.load(Ordering::SeqCst), 20);
    assert_eq!(backend.calls()[0], Call::Details(Some(3039)));

    assert_eq!(rows.len(), 1);
    let exams = &rows[0].exams;
    assert_eq!(exams.len(), 45);
    assert_eq!(exams[0].display_name, "Catálogo 1");
    assert_eq!(exams[6].display_name, "Exame 7");
    assert_eq!(exams[7].display_name, "Exame 8");
}

#[tokio::test]
async fn test_cancelled_reload_keeps_listing() {
    let backend = RecordingBackend::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut listing = three_row_listing();
    let result = ListingLoader::new(&backend)
        .reload(&mut listing, None, &cancel)
        .await;

    assert_eq!(result, Err(ApiError::Cancelled));
    assert_eq!(listing.rows().len(), 3);
}

#[tokio::test]
async fn test_profiles_with_exam_counts() {
    let backend = RecordingBackend::default();
    let profiles = ListingLoader::new(&backend).load_profiles().await.unwrap();

    assert_eq!(profiles.len(), 2);
    assert_eq!(profiles[0].group_id, 10);
    assert_eq!(profiles[0].exam_count, 3);
    assert_eq!(profiles[1].group_id, 12);
    assert_eq!(profiles[1].exam_count, 0);
}

#[tokio::test]
async fn test_blank_search_skips_backend() {
    let backend = RecordingBackend::default();
    let found = ListingLoader::new(&backend).search_exams("   ").await.unwrap();
    assert!(found.is_empty());
    assert!(backend.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Batch import
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_partial_failure_keeps_siblings() {
    let backend = RecordingBackend {
        rejected_cpfs: HashSet::from([CPF_BRUNO.to_string()]),
        ..RecordingBackend::default()
    };
    let records = roster();

    let summary = BatchImporter::new(&backend)
        .with_concurrency(2)
        .run(&records, "2024-05-10", 10, 3039, &CancellationToken::new())
        .await;

    assert!(summary.success);
    assert_eq!(summary.total_processed, 4);
    assert_eq!(summary.successes, 3);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.total_exams, 9);

    let names: Vec<&str> = summary
        .details
        .iter()
        .map(|d| d.patient_name.as_str())
        .collect();
    assert_eq!(names, vec!["Ana Souza", "Bruno Lima", "Carla Dias", "Davi Reis"]);
    assert_eq!(
        summary.details[1].error.as_deref(),
        Some("Paciente já agendado nesta data")
    );
}

#[tokio::test]
async fn test_session_lists_failed_rows_by_line() {
    let backend = RecordingBackend {
        rejected_cpfs: HashSet::from([CPF_BRUNO.to_string()]),
        ..RecordingBackend::default()
    };
    let mut session = previewing_session(roster());

    let summary = BatchImporter::new(&backend)
        .run_session(&mut session, Some(3039), &[], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(session.state_name(), "showing errors");
    let errors = session.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].name, "Bruno Lima");
    assert_eq!(errors[0].line_number, 3);
}

#[tokio::test]
async fn test_session_completes_without_errors() {
    let backend = RecordingBackend::default();
    let mut session = previewing_session(roster());

    BatchImporter::new(&backend)
        .run_session(&mut session, Some(0), &[3040], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(session.state_name(), "completed");
    assert_eq!(session.summary().map(|s| s.successes), Some(4));
}

#[tokio::test]
async fn test_unreachable_backend_fails_whole_session() {
    let backend = RecordingBackend {
        unreachable: true,
        ..RecordingBackend::default()
    };
    let mut session = previewing_session(roster());

    let summary = BatchImporter::new(&backend)
        .run_session(&mut session, None, &[], &CancellationToken::new())
        .await
        .unwrap();

    let expected = RecordingBackend::unreachable_error().user_message();
    assert!(!summary.success);
    assert_eq!(summary.message, expected);
    assert_eq!(session.state_name(), "showing errors");
    assert_eq!(session.errors().len(), 4);
    assert!(session.errors().iter().all(|e| e.message == expected));
}

#[tokio::test]
async fn test_cancel_stops_issuing_rows() {
    let cancel = CancellationToken::new();
    let backend = RecordingBackend {
        cancel_after_imports: Some((2, cancel.clone())),
        ..RecordingBackend::default()
    };
    let records = roster();

    let summary = BatchImporter::new(&backend)
        .with_concurrency(1)
        .run(&records, "2024-05-10", 10, 3039, &cancel)
        .await;

    let imports = backend
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::Import(_)))
        .count();
    assert_eq!(imports, 2);
    assert_eq!(summary.successes, 2);
    assert_eq!(summary.errors, 2);
    assert!(summary.details[0].success);
    assert!(summary.details[1].success);
    assert_eq!(
        summary.details[3].error.as_deref(),
        Some(ApiError::Cancelled.user_message().as_str())
    );
}

// ---------------------------------------------------------------------------
// Exam reconciliation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_additions_before_removals() {
    let backend = RecordingBackend::default();
    let mut listing = three_row_listing();
    let key = RowKey::new(1, CPF_ANA);

    let diff = ExamReconciler::new(&backend)
        .apply(&mut listing, &key, exams(&[2, 3, 4, 5]), 3039, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(diff.added_ids(), vec![4, 5]);
    assert_eq!(diff.removed_ids(), vec![1]);
    assert_eq!(
        backend.calls(),
        vec![
            Call::Add(key.clone(), 4),
            Call::Add(key.clone(), 5),
            Call::Remove(key.clone(), 1),
        ]
    );

    let ids: Vec<i64> = listing.row(&key).unwrap().exams.iter().map(|e| e.exam_id).collect();
    assert_eq!(ids, vec![2, 3, 4, 5]);
    // Other row with the same patient is untouched
    assert_eq!(listing.row(&RowKey::new(2, CPF_ANA)).unwrap().exams.len(), 1);
}

#[tokio::test]
async fn test_removals_overlap_additions_do_not() {
    let backend = RecordingBackend::default();
    let mut listing = three_row_listing();
    let key = RowKey::new(1, CPF_ANA);

    ExamReconciler::new(&backend)
        .apply(&mut listing, &key, exams(&[4, 5]), 3039, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        backend.calls(),
        vec![
            Call::Add(key.clone(), 4),
            Call::Add(key.clone(), 5),
            Call::Remove(key.clone(), 1),
            Call::Remove(key.clone(), 2),
            Call::Remove(key.clone(), 3),
        ]
    );
    assert_eq!(backend.adds.peak(), 1);
    assert_eq!(backend.removals.peak(), 3);
}

#[tokio::test]
async fn test_empty_edit_rejected_before_any_call() {
    let backend = RecordingBackend::default();
    let mut listing = three_row_listing();
    let key = RowKey::new(1, CPF_ANA);

    let err = ExamReconciler::new(&backend)
        .apply(&mut listing, &key, Vec::new(), 3039, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Reconcile(ReconcileError::WouldLeaveNoExams)
    ));
    assert!(backend.calls().is_empty());
    assert_eq!(listing.row(&key).unwrap().exams.len(), 3);
}

#[tokio::test]
async fn test_reordered_edit_patches_locally() {
    let backend = RecordingBackend::default();
    let mut listing = three_row_listing();
    let key = RowKey::new(1, CPF_ANA);

    let diff = ExamReconciler::new(&backend)
        .apply(&mut listing, &key, exams(&[3, 1, 2]), 3039, &CancellationToken::new())
        .await
        .unwrap();

    assert!(diff.is_empty());
    assert!(backend.calls().is_empty());
    assert_eq!(listing.row(&key).unwrap().exams[0].exam_id, 3);
}

#[tokio::test]
async fn test_failed_removal_leaves_row_untouched() {
    let backend = RecordingBackend {
        broken_removals: HashSet::from([1]),
        ..RecordingBackend::default()
    };
    let mut listing = three_row_listing();
    let key = RowKey::new(1, CPF_ANA);

    let err = ExamReconciler::new(&backend)
        .apply(&mut listing, &key, exams(&[2, 3, 4]), 3039, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Api(ApiError::Status { status: 404, .. })));
    let ids: Vec<i64> = listing.row(&key).unwrap().exams.iter().map(|e| e.exam_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_unknown_row() {
    let backend = RecordingBackend::default();
    let mut listing = three_row_listing();

    let err = ExamReconciler::new(&backend)
        .apply(
            &mut listing,
            &RowKey::new(99, CPF_ANA),
            exams(&[1]),
            3039,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::RowNotFound(_)));
}

// ---------------------------------------------------------------------------
// Pending transfer
// ---------------------------------------------------------------------------

fn select_all(listing: &mut ListingState) {
    listing.select_all_filtered();
    assert_eq!(listing.selection().len(), 3);
}

#[tokio::test]
async fn test_transfer_maps_results_per_cpf() {
    let backend = RecordingBackend {
        pending: Some(PendingResponse {
            sucesso: true,
            resultados: Some(vec![
                PendingResultDto {
                    cpf: CPF_ANA.into(),
                    enviado: true,
                    sucesso: true,
                    mensagem: None,
                },
                PendingResultDto {
                    cpf: CPF_BRUNO.into(),
                    enviado: false,
                    sucesso: false,
                    mensagem: Some("Paciente sem cadastro no laboratório".into()),
                },
            ]),
            mensagem: None,
        }),
        ..RecordingBackend::default()
    };
    let mut listing = three_row_listing();
    select_all(&mut listing);

    let report = PendingTransfer::new(&backend)
        .run_selected(&mut listing)
        .await
        .unwrap();

    assert_eq!(report.sent, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(
        backend.calls(),
        vec![Call::Pending(vec![CPF_ANA.into(), CPF_BRUNO.into()])]
    );

    let ana = listing.row(&RowKey::new(2, CPF_ANA)).unwrap();
    assert_eq!(ana.status, Some(RowStatus::Sent));
    assert!(!ana.editable);
    assert_eq!(
        listing.row(&RowKey::new(3, CPF_BRUNO)).unwrap().status,
        Some(RowStatus::Error)
    );
    assert!(listing.selection().is_empty());
}

#[tokio::test]
async fn test_transfer_overall_flag_without_results() {
    let backend = RecordingBackend {
        pending: Some(PendingResponse {
            sucesso: true,
            resultados: None,
            mensagem: Some("3 registros enviados".into()),
        }),
        ..RecordingBackend::default()
    };
    let mut listing = three_row_listing();
    select_all(&mut listing);

    let report = PendingTransfer::new(&backend)
        .run_selected(&mut listing)
        .await
        .unwrap();

    assert_eq!(report.sent, 3);
    assert_eq!(report.message.as_deref(), Some("3 registros enviados"));
    assert!(listing.rows().iter().all(|r| r.is_sent()));
}

#[tokio::test]
async fn test_transfer_transport_error_marks_rows() {
    let backend = RecordingBackend::default();
    let mut listing = three_row_listing();
    select_all(&mut listing);

    let err = PendingTransfer::new(&backend)
        .run_selected(&mut listing)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Api(ApiError::Connection(_))));
    assert!(listing
        .rows()
        .iter()
        .all(|r| r.status == Some(RowStatus::Error)));
    assert_eq!(listing.selection().len(), 3);
}

#[tokio::test]
async fn test_transfer_with_nothing_selected() {
    let backend = RecordingBackend::default();
    let mut listing = three_row_listing();

    let err = PendingTransfer::new(&backend)
        .run_selected(&mut listing)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::NothingSelected));
    assert!(backend.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Soft delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_remove_by_cpf_drops_every_row_of_patient() {
    let backend = RecordingBackend::default();
    let mut listing = three_row_listing();
    listing.toggle_selected(&RowKey::new(1, CPF_ANA));

    let removed = RowRemover::new(&backend)
        .remove_selected(&mut listing, RemovalMode::ByCpf)
        .await
        .unwrap();

    assert_eq!(removed, 2);
    assert_eq!(backend.calls(), vec![Call::RemoveByCpf(vec![CPF_ANA.into()])]);
    assert_eq!(listing.rows().len(), 1);
    assert!(listing.selection().is_empty());
}

#[tokio::test]
async fn test_remove_by_appointment_drops_only_selected_row() {
    let backend = RecordingBackend::default();
    let mut listing = three_row_listing();
    let key = RowKey::new(1, CPF_ANA);
    listing.toggle_selected(&key);

    let removed = RowRemover::new(&backend)
        .remove_selected(&mut listing, RemovalMode::ByAppointment)
        .await
        .unwrap();

    assert_eq!(removed, 1);
    assert_eq!(backend.calls(), vec![Call::RemoveByAppointment(vec![key.clone()])]);
    assert!(listing.row(&key).is_none());
    assert!(listing.row(&RowKey::new(2, CPF_ANA)).is_some());
}
