//! Exam and exam profile models.

use serde::{Deserialize, Serialize};

/// Collection material used when neither the agenda nor the catalog names one.
pub const DEFAULT_MATERIAL: &str = "Soro";

/// An exam attached to an appointment-patient pairing. Identity is `exam_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExamDetail {
    pub exam_id: i64,
    /// Short exam code (sigla)
    pub exam_code: String,
    /// Code of the exam in the lab database
    pub internal_db_code: String,
    /// Profile the exam was scheduled through, if any
    pub group_id: Option<i64>,
    pub display_name: String,
    pub material: String,
}

impl ExamDetail {
    /// Create an exam with default code/material.
    pub fn new(exam_id: i64, display_name: impl Into<String>) -> Self {
        Self {
            exam_id,
            exam_code: String::new(),
            internal_db_code: String::new(),
            group_id: None,
            display_name: display_name.into(),
            material: DEFAULT_MATERIAL.to_string(),
        }
    }

    /// Fallback display name for an exam with no description anywhere.
    pub fn placeholder_name(exam_id: i64) -> String {
        format!("Exame {}", exam_id)
    }
}

/// A named, reusable bundle of exams assignable to an appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExamProfile {
    pub group_id: i64,
    pub name: String,
    pub exam_count: usize,
}

impl ExamProfile {
    pub fn new(group_id: i64, name: impl Into<String>) -> Self {
        Self {
            group_id,
            name: name.into(),
            exam_count: 0,
        }
    }
}
