//! Appointment-patient rows as shown in the agenda listing.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::exam::ExamDetail;

/// Composite identity of a listing row.
///
/// A patient with several appointments appears once per appointment, so the
/// CPF alone is not unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey {
    pub appointment_id: i64,
    pub cpf: String,
}

impl RowKey {
    pub fn new(appointment_id: i64, cpf: impl Into<String>) -> Self {
        Self {
            appointment_id,
            cpf: cpf.into(),
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.appointment_id, self.cpf)
    }
}

/// Synchronization status of a row toward the downstream lab system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    /// Transfer requested, awaiting the backend
    Pending,
    /// All exams delivered
    Sent,
    /// Last transfer attempt failed
    Error,
    /// Loaded from the backend, not yet sent
    Correct,
}

/// One appointment of one patient, with its exams.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentPatientRow {
    pub key: RowKey,
    pub patient_id: Option<i64>,
    pub name: String,
    pub treatment: String,
    pub diabetes: bool,
    /// Collection date (`YYYY-MM-DD`)
    pub appointment_date: String,
    /// Registration date (`YYYY-MM-DD`), empty if the backend omits it
    pub registration_date: String,
    pub unit_id: Option<i64>,
    /// `None` until the row has been through a transfer or a reload
    pub status: Option<RowStatus>,
    pub exams: Vec<ExamDetail>,
    /// False once every exam has been sent upstream
    pub editable: bool,
}

impl AppointmentPatientRow {
    /// Create an editable row with no exams.
    pub fn new(key: RowKey, name: impl Into<String>) -> Self {
        Self {
            key,
            patient_id: None,
            name: name.into(),
            treatment: String::new(),
            diabetes: false,
            appointment_date: String::new(),
            registration_date: String::new(),
            unit_id: None,
            status: None,
            exams: Vec::new(),
            editable: true,
        }
    }

    pub fn cpf(&self) -> &str {
        &self.key.cpf
    }

    pub fn is_sent(&self) -> bool {
        self.status == Some(RowStatus::Sent)
    }

    /// Sent rows can never be selected for transfer or deletion.
    pub fn is_selectable(&self) -> bool {
        !self.is_sent()
    }

    pub fn has_exam(&self, exam_id: i64) -> bool {
        self.exams.iter().any(|e| e.exam_id == exam_id)
    }

    /// Mark the row as delivered upstream; it becomes read-only.
    pub fn mark_sent(&mut self) {
        self.status = Some(RowStatus::Sent);
        self.editable = false;
    }
}
