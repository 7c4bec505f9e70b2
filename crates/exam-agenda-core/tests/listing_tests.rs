//! Listing, selection and reconciliation behaviour over rows built from
//! backend payloads.

use std::collections::HashMap;

use exam_agenda_core::dto::{build_rows, AgendaDetailDto, ApiEnvelope};
use exam_agenda_core::listing::{total_pages, visible_pages, StatusFilter};
use exam_agenda_core::{
    ExamDetail, ExamEditor, ListingFilter, ListingState, ReconcileError, ReconciliationPlan,
    RowKey, RowStatus,
};

fn agenda_payload() -> Vec<AgendaDetailDto> {
    let body = r#"{
        "sucesso": true,
        "dados": [
            {"iD_AGENDAMENTO": 1, "cpF_PACIENTE": "52998224725", "iD_EXAME": 1, "nome": "Ana Souza",
             "datA_AGENDAMENTO": "2024-03-01T00:00:00", "inD_REG_ENVIADO": 0},
            {"iD_AGENDAMENTO": 1, "cpF_PACIENTE": "52998224725", "iD_EXAME": 2, "inD_REG_ENVIADO": 0},
            {"iD_AGENDAMENTO": 1, "cpF_PACIENTE": "52998224725", "iD_EXAME": 3, "inD_REG_ENVIADO": 0},
            {"iD_AGENDAMENTO": 2, "cpF_PACIENTE": "52998224725", "iD_EXAME": 1, "nome": "Ana Souza",
             "datA_AGENDAMENTO": "2024-04-01T00:00:00", "inD_REG_ENVIADO": 1},
            {"iD_AGENDAMENTO": 3, "cpF_PACIENTE": "11144477735", "iD_EXAME": 1, "nome": "Bruno Lima",
             "datA_AGENDAMENTO": "2024-03-15T00:00:00", "inD_REG_ENVIADO": 0}
        ]
    }"#;
    let envelope: ApiEnvelope<Vec<AgendaDetailDto>> = serde_json::from_str(body).unwrap();
    envelope.into_result().unwrap().unwrap_or_default()
}

fn listing() -> ListingState {
    ListingState::new(build_rows(&agenda_payload(), &HashMap::new()))
}

fn exams(ids: &[i64]) -> Vec<ExamDetail> {
    ids.iter()
        .map(|id| ExamDetail::new(*id, format!("Exame {}", id)))
        .collect()
}

#[test]
fn test_pagination_properties() {
    assert_eq!(total_pages(127, 50), 3);
    assert_eq!(visible_pages(2, 10), vec![1, 2, 3, 4, 5]);
    assert_eq!(visible_pages(1, 10), vec![1, 2, 3, 4, 5]);
    assert_eq!(visible_pages(10, 10), vec![6, 7, 8, 9, 10]);
    assert_eq!(visible_pages(9, 10), vec![6, 7, 8, 9, 10]);
}

#[test]
fn test_rows_keyed_by_appointment_and_cpf() {
    let listing = listing();
    assert_eq!(listing.rows().len(), 3);

    let first = listing.row(&RowKey::new(1, "52998224725")).unwrap();
    let second = listing.row(&RowKey::new(2, "52998224725")).unwrap();
    assert_eq!(first.exams.len(), 3);
    assert_eq!(first.status, Some(RowStatus::Correct));
    assert_eq!(second.status, Some(RowStatus::Sent));
    assert!(!second.editable);
}

#[test]
fn test_sent_row_cannot_be_selected() {
    let mut listing = listing();
    let sent = RowKey::new(2, "52998224725");

    assert!(!listing.toggle_selected(&sent));
    assert!(!listing.is_selected(&sent));

    listing.select_all_filtered();
    assert_eq!(listing.selection().len(), 2);
    assert!(!listing.is_selected(&sent));
    assert!(listing.all_filtered_selected());
}

#[test]
fn test_status_filter_pending_means_not_sent() {
    let mut listing = listing();
    listing.set_filter(ListingFilter {
        status: StatusFilter::Pending,
        ..Default::default()
    });
    assert_eq!(listing.filtered().len(), 2);

    listing.set_filter(ListingFilter {
        status: StatusFilter::Sent,
        ..Default::default()
    });
    assert_eq!(listing.filtered().len(), 1);
}

#[test]
fn test_reconciliation_diff() {
    let listing = listing();
    let row = listing.row(&RowKey::new(1, "52998224725")).unwrap();

    let plan = ReconciliationPlan::new(row, exams(&[2, 3, 4])).unwrap();
    assert_eq!(plan.diff.added_ids(), vec![4]);
    assert_eq!(plan.diff.removed_ids(), vec![1]);
    assert!(!plan.is_noop());
}

#[test]
fn test_reconciliation_rejects_empty_target() {
    let listing = listing();
    let row = listing.row(&RowKey::new(1, "52998224725")).unwrap();

    assert_eq!(
        ReconciliationPlan::new(row, Vec::new()),
        Err(ReconcileError::WouldLeaveNoExams)
    );

    let mut editor = ExamEditor::for_row(row).unwrap();
    editor.remove(1).unwrap();
    editor.remove(2).unwrap();
    assert_eq!(editor.remove(3), Err(ReconcileError::WouldLeaveNoExams));
}

#[test]
fn test_patch_after_reconciliation_keeps_state() {
    let mut listing = listing();
    let key = RowKey::new(1, "52998224725");
    listing.toggle_selected(&key);
    listing.set_filter(ListingFilter::text("ana"));

    let plan = ReconciliationPlan::new(listing.row(&key).unwrap(), exams(&[2, 3, 4])).unwrap();
    listing.replace_exams(&plan.key, plan.target.clone());

    let ids: Vec<i64> = listing
        .row(&key)
        .unwrap()
        .exams
        .iter()
        .map(|e| e.exam_id)
        .collect();
    assert_eq!(ids, vec![2, 3, 4]);
    assert!(listing.is_selected(&key));
    assert_eq!(listing.filter().text, "ana");
}
