//! Import session state machine.
//!
//! ```text
//! Idle → FileSelected → Previewing → Importing → Completed
//!            ↑              │            │
//!            └─ cancel_preview           └────→ ShowingErrors
//! ```
//!
//! Each state owns exactly the data valid in it, so "importing without a
//! profile" or "showing errors without a summary" cannot be expressed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::ingest::SourceFile;
use crate::models::{ExamProfile, ImportErrorRecord, ImportSummary, PatientImportRecord};

/// Unit used when neither the user nor the known unit list provides one.
pub const FALLBACK_UNIT_ID: i64 = 3039;

/// Session errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Cannot {action} while {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },

    #[error("An exam profile must be selected")]
    MissingProfile,

    #[error("Invalid appointment date: {0:?}")]
    InvalidDate(String),

    #[error("The roster has no patients")]
    NoRecords,

    #[error("No record at index {0}")]
    RecordOutOfRange(usize),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Choices shared by every row of an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSettings {
    pub appointment_date: NaiveDate,
    pub profile: ExamProfile,
    /// Units picked by the user; empty means "resolve automatically"
    pub selected_units: Vec<i64>,
}

/// Everything a batch import needs, handed out by [`ImportSession::start_import`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImportJob {
    pub session_id: Uuid,
    pub records: Vec<PatientImportRecord>,
    /// `YYYY-MM-DD`
    pub appointment_date: String,
    pub group_id: i64,
    pub unit_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ImportSession {
    #[default]
    Idle,
    FileSelected {
        session_id: Uuid,
        source: SourceFile,
        records: Vec<PatientImportRecord>,
    },
    Previewing {
        session_id: Uuid,
        source: SourceFile,
        records: Vec<PatientImportRecord>,
        settings: ImportSettings,
    },
    Importing {
        session_id: Uuid,
        source: SourceFile,
        records: Vec<PatientImportRecord>,
        settings: ImportSettings,
    },
    Completed {
        session_id: Uuid,
        summary: ImportSummary,
    },
    ShowingErrors {
        session_id: Uuid,
        summary: ImportSummary,
        errors: Vec<ImportErrorRecord>,
    },
}

impl ImportSession {
    pub fn new() -> Self {
        Self::Idle
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            ImportSession::Idle => "idle",
            ImportSession::FileSelected { .. } => "file selected",
            ImportSession::Previewing { .. } => "previewing",
            ImportSession::Importing { .. } => "importing",
            ImportSession::Completed { .. } => "completed",
            ImportSession::ShowingErrors { .. } => "showing errors",
        }
    }

    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            ImportSession::Idle => None,
            ImportSession::FileSelected { session_id, .. }
            | ImportSession::Previewing { session_id, .. }
            | ImportSession::Importing { session_id, .. }
            | ImportSession::Completed { session_id, .. }
            | ImportSession::ShowingErrors { session_id, .. } => Some(*session_id),
        }
    }

    /// Parsed records, while there still are any.
    pub fn records(&self) -> &[PatientImportRecord] {
        match self {
            ImportSession::FileSelected { records, .. }
            | ImportSession::Previewing { records, .. }
            | ImportSession::Importing { records, .. } => records,
            _ => &[],
        }
    }

    pub fn summary(&self) -> Option<&ImportSummary> {
        match self {
            ImportSession::Completed { summary, .. }
            | ImportSession::ShowingErrors { summary, .. } => Some(summary),
            _ => None,
        }
    }

    pub fn errors(&self) -> &[ImportErrorRecord] {
        match self {
            ImportSession::ShowingErrors { errors, .. } => errors,
            _ => &[],
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, ImportSession::Importing { .. })
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            from: self.state_name(),
            action,
        }
    }

    /// Load a parsed file. Replaces any file chosen earlier.
    pub fn select_file(
        &mut self,
        source: SourceFile,
        records: Vec<PatientImportRecord>,
    ) -> SessionResult<Uuid> {
        match self {
            ImportSession::Idle
            | ImportSession::FileSelected { .. }
            | ImportSession::Previewing { .. } => {}
            _ => return Err(self.invalid("select a file")),
        }

        let session_id = Uuid::new_v4();
        *self = ImportSession::FileSelected {
            session_id,
            source,
            records,
        };
        Ok(session_id)
    }

    /// Assign the shared appointment date and exam profile.
    pub fn begin_preview(
        &mut self,
        appointment_date: &str,
        profile: Option<ExamProfile>,
    ) -> SessionResult<()> {
        if !matches!(self, ImportSession::FileSelected { .. }) {
            return Err(self.invalid("preview"));
        }
        let date = NaiveDate::parse_from_str(appointment_date.trim(), "%Y-%m-%d")
            .map_err(|_| SessionError::InvalidDate(appointment_date.to_string()))?;
        let profile = profile.ok_or(SessionError::MissingProfile)?;
        if self.records().is_empty() {
            return Err(SessionError::NoRecords);
        }

        if let ImportSession::FileSelected {
            session_id,
            source,
            records,
        } = std::mem::take(self)
        {
            *self = ImportSession::Previewing {
                session_id,
                source,
                records,
                settings: ImportSettings {
                    appointment_date: date,
                    profile,
                    selected_units: Vec::new(),
                },
            };
        }
        Ok(())
    }

    /// Restrict the import to the given units.
    pub fn select_units(&mut self, units: Vec<i64>) -> SessionResult<()> {
        match self {
            ImportSession::Previewing { settings, .. } => {
                settings.selected_units = units;
                Ok(())
            }
            _ => Err(self.invalid("select units")),
        }
    }

    /// Replace one record during the preview.
    pub fn edit_record(&mut self, index: usize, record: PatientImportRecord) -> SessionResult<()> {
        match self {
            ImportSession::Previewing { records, .. } => {
                let slot = records
                    .get_mut(index)
                    .ok_or(SessionError::RecordOutOfRange(index))?;
                // Keep the spreadsheet line for error reporting
                let line_number = slot.line_number;
                *slot = PatientImportRecord {
                    line_number,
                    ..record
                };
                Ok(())
            }
            _ => Err(self.invalid("edit a record")),
        }
    }

    /// Drop one record during the preview.
    pub fn remove_record(&mut self, index: usize) -> SessionResult<PatientImportRecord> {
        match self {
            ImportSession::Previewing { records, .. } => {
                if index >= records.len() {
                    return Err(SessionError::RecordOutOfRange(index));
                }
                Ok(records.remove(index))
            }
            _ => Err(self.invalid("remove a record")),
        }
    }

    /// Back from the preview to the bare file.
    pub fn cancel_preview(&mut self) -> SessionResult<()> {
        if !matches!(self, ImportSession::Previewing { .. }) {
            return Err(self.invalid("cancel the preview"));
        }
        if let ImportSession::Previewing {
            session_id,
            source,
            records,
            ..
        } = std::mem::take(self)
        {
            *self = ImportSession::FileSelected {
                session_id,
                source,
                records,
            };
        }
        Ok(())
    }

    /// Abandon the file. Not allowed mid-import; cancel the job instead.
    pub fn cancel(&mut self) -> SessionResult<()> {
        match self {
            ImportSession::Importing { .. } => Err(self.invalid("cancel")),
            _ => {
                *self = ImportSession::Idle;
                Ok(())
            }
        }
    }

    /// Commit the preview and hand out the job to run.
    pub fn start_import(
        &mut self,
        user_unit: Option<i64>,
        known_units: &[i64],
    ) -> SessionResult<ImportJob> {
        let ImportSession::Previewing {
            session_id,
            records,
            settings,
            ..
        } = &*self
        else {
            return Err(self.invalid("start the import"));
        };
        if records.is_empty() {
            return Err(SessionError::NoRecords);
        }

        let job = ImportJob {
            session_id: *session_id,
            records: records.clone(),
            appointment_date: settings.appointment_date.format("%Y-%m-%d").to_string(),
            group_id: settings.profile.group_id,
            unit_id: resolve_import_unit(&settings.selected_units, user_unit, known_units),
        };

        if let ImportSession::Previewing {
            session_id,
            source,
            records,
            settings,
        } = std::mem::take(self)
        {
            *self = ImportSession::Importing {
                session_id,
                source,
                records,
                settings,
            };
        }
        Ok(job)
    }

    /// Record the batch result. Any failed row leads to the error list.
    pub fn finish(&mut self, summary: ImportSummary) -> SessionResult<()> {
        let ImportSession::Importing {
            session_id,
            records,
            ..
        } = &*self
        else {
            return Err(self.invalid("finish"));
        };

        let session_id = *session_id;
        *self = if summary.errors == 0 {
            ImportSession::Completed {
                session_id,
                summary,
            }
        } else {
            let errors = summary.error_records(records);
            ImportSession::ShowingErrors {
                session_id,
                summary,
                errors,
            }
        };
        Ok(())
    }

    /// The whole batch failed (connection down, 502...): every row is an error.
    pub fn fail(&mut self, message: &str) -> SessionResult<()> {
        let ImportSession::Importing {
            session_id,
            records,
            ..
        } = &*self
        else {
            return Err(self.invalid("fail"));
        };

        let session_id = *session_id;
        let summary = ImportSummary::failed_all(records, message);
        let errors = summary.error_records(records);
        *self = ImportSession::ShowingErrors {
            session_id,
            summary,
            errors,
        };
        Ok(())
    }

    /// Close the result view.
    pub fn dismiss(&mut self) -> SessionResult<()> {
        match self {
            ImportSession::Completed { .. } | ImportSession::ShowingErrors { .. } => {
                *self = ImportSession::Idle;
                Ok(())
            }
            _ => Err(self.invalid("dismiss")),
        }
    }
}

/// Unit an import is scheduled under.
///
/// Priority: first unit picked by the user, the user's own unit, the first
/// known unit, then [`FALLBACK_UNIT_ID`]. A user unit of 0 (consolidator)
/// is not a real unit and falls through.
pub fn resolve_import_unit(selected: &[i64], user_unit: Option<i64>, known_units: &[i64]) -> i64 {
    selected
        .first()
        .copied()
        .or(user_unit.filter(|u| *u != 0))
        .or_else(|| known_units.first().copied())
        .unwrap_or(FALLBACK_UNIT_ID)
}
