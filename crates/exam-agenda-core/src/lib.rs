//! Exam Agenda Core Library
//!
//! Roster ingestion, reconciliation and listing state for clinical exam
//! scheduling. Synchronous and I/O-free apart from reading the uploaded
//! spreadsheet; the backend adapter lives in `exam-agenda-sync`.
//!
//! # Architecture
//!
//! ```text
//! Spreadsheet (.xlsx/.xls/.ods/.csv)
//!        │
//!        ▼
//!    RawRow ──► FieldExtractor ──► Normalizer ──► PatientImportRecord
//!                (aliases,          (CPF, dates,        │
//!                 fuzzy headers)     weight/height)     │
//!                                                       ▼
//!                                     ImportSession (preview, edit, commit)
//!                                                       │
//!                                                       ▼
//!                                              Batch import (sync crate)
//!                                                       │
//!                                                       ▼
//!  GET /agenda-detalhe ──► dto::build_rows ──► ListingState
//!                                               │   filter · page · select
//!                                               ▼
//!                                     ReconciliationPlan (exam edits)
//! ```
//!
//! # Core Principle
//!
//! **Bad input degrades, it never blocks.** Unreadable dates become empty,
//! unreadable numbers take defaults, and CPF problems are reported as
//! warnings; the backend decides what to reject.
//!
//! # Modules
//!
//! - [`models`]: Domain types (PatientImportRecord, ExamDetail, AppointmentPatientRow, etc.)
//! - [`ingest`]: Spreadsheet reader, field extractor, normalizers, advisory validation
//! - [`dto`]: Backend payloads, normalized to canonical field names on receipt
//! - [`reconcile`]: Exam add/remove planning for one appointment
//! - [`listing`]: Filtering, pagination and selection over loaded rows
//! - [`session`]: Import session state machine

pub mod dto;
pub mod ingest;
pub mod listing;
pub mod models;
pub mod reconcile;
pub mod session;

// Re-export commonly used types
pub use ingest::{
    FieldExtractor, RawRow, RowIngestor, SourceFile, Spreadsheet, SpreadsheetError,
    SpreadsheetReader,
};
pub use listing::{ListingFilter, ListingState, ListingStats, Selection, StatusFilter};
pub use models::{
    AppointmentPatientRow, DiabetesFlag, ExamDetail, ExamProfile, ImportErrorRecord,
    ImportSummary, PatientImportRecord, RowImportResult, RowKey, RowStatus,
};
pub use reconcile::{ExamDiff, ExamEditor, ReconcileError, ReconciliationPlan};
pub use session::{ImportJob, ImportSession, ImportSettings, SessionError};
