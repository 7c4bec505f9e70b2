//! Batch import results.

use serde::{Deserialize, Serialize};

use super::patient::PatientImportRecord;

/// Outcome of importing a single roster row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowImportResult {
    pub patient_id: Option<i64>,
    pub patient_name: String,
    pub appointment_id: Option<i64>,
    pub success: bool,
    pub total_exams: u32,
    pub message: String,
    pub error: Option<String>,
}

impl RowImportResult {
    /// Successful import of one patient.
    pub fn succeeded(
        record: &PatientImportRecord,
        patient_id: Option<i64>,
        appointment_id: Option<i64>,
        total_exams: u32,
    ) -> Self {
        Self {
            patient_id,
            patient_name: record.name.clone(),
            appointment_id,
            success: true,
            total_exams,
            message: format!("{}: {} exams scheduled", record.name, total_exams),
            error: None,
        }
    }

    /// Failed import of one patient.
    pub fn failed(record: &PatientImportRecord, error: impl Into<String>) -> Self {
        Self {
            patient_id: None,
            patient_name: record.name.clone(),
            appointment_id: None,
            success: false,
            total_exams: 0,
            message: String::new(),
            error: Some(error.into()),
        }
    }
}

/// Aggregated result of a batch import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportSummary {
    /// True iff at least one row succeeded
    pub success: bool,
    pub total_processed: usize,
    pub successes: usize,
    pub errors: usize,
    pub total_exams: u32,
    pub details: Vec<RowImportResult>,
    pub message: String,
}

impl ImportSummary {
    /// Aggregate per-row results. `details` must be in roster order.
    pub fn from_results(details: Vec<RowImportResult>) -> Self {
        let successes = details.iter().filter(|r| r.success).count();
        let errors = details.len() - successes;
        let total_exams = details.iter().map(|r| r.total_exams).sum();

        Self {
            success: successes > 0,
            total_processed: details.len(),
            successes,
            errors,
            total_exams,
            message: format!(
                "{} patients imported with {} exams scheduled",
                successes, total_exams
            ),
            details,
        }
    }

    /// Summary for a batch that failed as a whole (every row counts as an error).
    pub fn failed_all(records: &[PatientImportRecord], error: &str) -> Self {
        let details = records
            .iter()
            .map(|r| RowImportResult::failed(r, error))
            .collect();
        let mut summary = Self::from_results(details);
        summary.message = error.to_string();
        summary
    }

    /// Error records for every failed row, keyed by spreadsheet line.
    pub fn error_records(&self, records: &[PatientImportRecord]) -> Vec<ImportErrorRecord> {
        self.details
            .iter()
            .enumerate()
            .filter(|(_, detail)| !detail.success)
            .map(|(index, detail)| {
                let record = records.get(index);
                let name = if !detail.patient_name.is_empty() {
                    detail.patient_name.clone()
                } else {
                    record
                        .map(|r| r.name.clone())
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| "Unknown".to_string())
                };
                let message = detail
                    .error
                    .clone()
                    .filter(|e| !e.is_empty())
                    .or_else(|| Some(detail.message.clone()).filter(|m| !m.is_empty()))
                    .unwrap_or_else(|| "Unknown import error".to_string());

                ImportErrorRecord {
                    name,
                    cpf: record
                        .map(|r| r.cpf.clone())
                        .filter(|c| !c.is_empty())
                        .unwrap_or_else(|| "N/A".to_string()),
                    message,
                    line_number: record
                        .map(|r| r.line_number)
                        .unwrap_or_else(|| PatientImportRecord::line_for_index(index)),
                }
            })
            .collect()
    }
}

/// A roster row the backend refused, as shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportErrorRecord {
    pub name: String,
    pub cpf: String,
    pub message: String,
    pub line_number: usize,
}
