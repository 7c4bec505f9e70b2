//! Exam reconciliation planning.
//!
//! Computes what has to be added to and removed from an appointment's exam
//! list to reach an edited list. An appointment must never end up with zero
//! exams, so an empty target is rejected here, before any network call, and
//! executors must issue every addition before any removal.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AppointmentPatientRow, ExamDetail, RowKey};

/// Reconciliation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("An appointment must keep at least one exam")]
    WouldLeaveNoExams,

    #[error("Exam {0} is already in the list")]
    DuplicateExam(i64),

    #[error("Exam {0} is not in the list")]
    ExamNotFound(i64),

    #[error("Row {0} has been sent and can no longer be edited")]
    RowNotEditable(RowKey),
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Set difference by exam id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamDiff {
    /// In edited order
    pub added: Vec<ExamDetail>,
    /// In original order
    pub removed: Vec<ExamDetail>,
}

impl ExamDiff {
    pub fn between(original: &[ExamDetail], edited: &[ExamDetail]) -> Self {
        let original_ids: HashSet<i64> = original.iter().map(|e| e.exam_id).collect();
        let edited_ids: HashSet<i64> = edited.iter().map(|e| e.exam_id).collect();

        Self {
            added: edited
                .iter()
                .filter(|e| !original_ids.contains(&e.exam_id))
                .cloned()
                .collect(),
            removed: original
                .iter()
                .filter(|e| !edited_ids.contains(&e.exam_id))
                .cloned()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn added_ids(&self) -> Vec<i64> {
        self.added.iter().map(|e| e.exam_id).collect()
    }

    pub fn removed_ids(&self) -> Vec<i64> {
        self.removed.iter().map(|e| e.exam_id).collect()
    }
}

/// A validated edit of one row's exams.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationPlan {
    pub key: RowKey,
    pub diff: ExamDiff,
    /// Exam list the row holds once the plan is applied
    pub target: Vec<ExamDetail>,
}

impl ReconciliationPlan {
    /// Plan the edit of `row` to `edited`.
    pub fn new(row: &AppointmentPatientRow, edited: Vec<ExamDetail>) -> ReconcileResult<Self> {
        if !row.editable {
            return Err(ReconcileError::RowNotEditable(row.key.clone()));
        }
        if edited.is_empty() {
            return Err(ReconcileError::WouldLeaveNoExams);
        }
        let mut seen = HashSet::new();
        if let Some(dup) = edited.iter().find(|e| !seen.insert(e.exam_id)) {
            return Err(ReconcileError::DuplicateExam(dup.exam_id));
        }

        Ok(Self {
            key: row.key.clone(),
            diff: ExamDiff::between(&row.exams, &edited),
            target: edited,
        })
    }

    /// Nothing to send; the row can be patched locally.
    pub fn is_noop(&self) -> bool {
        self.diff.is_empty()
    }
}

/// Scratch copy of a row's exams while the user edits them.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamEditor {
    key: RowKey,
    exams: Vec<ExamDetail>,
}

impl ExamEditor {
    /// Start editing a row. Sent rows are read-only.
    pub fn for_row(row: &AppointmentPatientRow) -> ReconcileResult<Self> {
        if !row.editable {
            return Err(ReconcileError::RowNotEditable(row.key.clone()));
        }
        Ok(Self {
            key: row.key.clone(),
            exams: row.exams.clone(),
        })
    }

    pub fn key(&self) -> &RowKey {
        &self.key
    }

    pub fn exams(&self) -> &[ExamDetail] {
        &self.exams
    }

    pub fn contains(&self, exam_id: i64) -> bool {
        self.exams.iter().any(|e| e.exam_id == exam_id)
    }

    pub fn add(&mut self, exam: ExamDetail) -> ReconcileResult<()> {
        if self.contains(exam.exam_id) {
            return Err(ReconcileError::DuplicateExam(exam.exam_id));
        }
        self.exams.push(exam);
        Ok(())
    }

    /// Remove an exam from the scratch list; the last exam cannot go.
    pub fn remove(&mut self, exam_id: i64) -> ReconcileResult<ExamDetail> {
        let pos = self
            .exams
            .iter()
            .position(|e| e.exam_id == exam_id)
            .ok_or(ReconcileError::ExamNotFound(exam_id))?;
        if self.exams.len() == 1 {
            return Err(ReconcileError::WouldLeaveNoExams);
        }
        Ok(self.exams.remove(pos))
    }

    /// Finish editing and plan against the row's current exams.
    pub fn into_plan(self, row: &AppointmentPatientRow) -> ReconcileResult<ReconciliationPlan> {
        ReconciliationPlan::new(row, self.exams)
    }
}
