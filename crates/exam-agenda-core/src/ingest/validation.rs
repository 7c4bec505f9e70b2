//! Advisory checks on extracted records, shown in the preview.
//!
//! Warnings never block an import; the backend has the final say.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::normalizer::{cpf_status, CpfStatus};
use crate::models::PatientImportRecord;

/// Something a reviewer may want to fix before importing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordWarning {
    NameTooShort,
    CpfWrongLength { length: usize },
    CpfRepeatedDigits,
    CpfChecksumMismatch,
    MissingTreatment,
    MissingBirthDate,
}

impl fmt::Display for RecordWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordWarning::NameTooShort => write!(f, "name has fewer than 3 characters"),
            RecordWarning::CpfWrongLength { length } => {
                write!(f, "CPF has {} digits, expected 11", length)
            }
            RecordWarning::CpfRepeatedDigits => write!(f, "CPF repeats a single digit"),
            RecordWarning::CpfChecksumMismatch => write!(f, "CPF check digits do not match"),
            RecordWarning::MissingTreatment => write!(f, "treatment type is empty"),
            RecordWarning::MissingBirthDate => write!(f, "birth date missing or unreadable"),
        }
    }
}

/// Collect warnings for one record.
pub fn validate_record(record: &PatientImportRecord) -> Vec<RecordWarning> {
    let mut warnings = Vec::new();

    if record.name.trim().chars().count() < 3 {
        warnings.push(RecordWarning::NameTooShort);
    }

    match cpf_status(&record.cpf) {
        CpfStatus::Valid => {}
        CpfStatus::WrongLength => warnings.push(RecordWarning::CpfWrongLength {
            length: record.cpf.len(),
        }),
        CpfStatus::RepeatedDigits => warnings.push(RecordWarning::CpfRepeatedDigits),
        CpfStatus::ChecksumMismatch => warnings.push(RecordWarning::CpfChecksumMismatch),
    }

    if record.treatment_type.trim().is_empty() {
        warnings.push(RecordWarning::MissingTreatment);
    }
    if record.birth_date.is_empty() {
        warnings.push(RecordWarning::MissingBirthDate);
    }

    warnings
}
