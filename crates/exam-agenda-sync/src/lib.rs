//! Exam Agenda Sync
//!
//! Async side of the exam agenda: the REST backend adapter and the
//! workflows that drive the core state through it.
//!
//! # Architecture
//!
//! ```text
//!  AgendaConfig (env) ──► HttpBackend ──implements──► AgendaBackend
//!                                                          │
//!        ┌───────────────┬───────────────┬────────────────┼──────────────┐
//!        ▼               ▼               ▼                ▼              ▼
//!  ListingLoader   BatchImporter   ExamReconciler   PendingTransfer  RowRemover
//!   (batched        (per-row        (adds in order,  (per-CPF         (soft
//!    catalog)        results)        removes joined)  results)         delete)
//!        │               │               │                │              │
//!        ▼               ▼               ▼                ▼              ▼
//!   ListingState    ImportSession   ListingState::replace_exams ... set_status / remove_rows
//! ```
//!
//! Long-running calls take a `CancellationToken`; a cancelled import stops
//! issuing rows and reports the rest as errors.
//!
//! # Modules
//!
//! - [`backend`]: The `AgendaBackend` trait
//! - [`http`]: reqwest implementation
//! - [`config`]: Environment configuration
//! - [`error`]: `ApiError` with user-facing messages, `SyncError`
//! - [`loader`], [`importer`], [`reconciler`], [`transfer`], [`removal`]: Workflows

pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod importer;
pub mod loader;
pub mod reconciler;
pub mod removal;
pub mod transfer;

// Re-export commonly used types
pub use backend::AgendaBackend;
pub use config::{AgendaConfig, ConfigError};
pub use error::{ApiError, ApiResult, SyncError, SyncResult};
pub use http::HttpBackend;
pub use importer::BatchImporter;
pub use loader::ListingLoader;
pub use reconciler::ExamReconciler;
pub use removal::{RemovalMode, RowRemover};
pub use transfer::{PendingTransfer, TransferReport};
pub use tokio_util::sync::CancellationToken;
