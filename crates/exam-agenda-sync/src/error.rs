//! Backend and workflow errors.

use exam_agenda_core::{ReconcileError, RowKey, SessionError};
use thiserror::Error;

/// Errors talking to the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Cannot connect to backend at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Backend error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Rejected by backend: {0}")]
    Rejected(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// HTTP status, with 0 for failures that never got a response.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Status { status, .. } => *status,
            _ => 0,
        }
    }

    /// Text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Cancelled => "Operation cancelled.".to_string(),
            ApiError::Rejected(message) => message.clone(),
            ApiError::Decode(_) => "The server sent an unexpected response.".to_string(),
            ApiError::Timeout(_) => {
                "The server took too long to respond. Try again in a moment.".to_string()
            }
            _ => match self.status_code() {
                0 => "Cannot connect to the server. Check your connection.".to_string(),
                401 => "Your session has expired. Log in again.".to_string(),
                403 => "You do not have permission to access this unit's data.".to_string(),
                404 => "The requested resource was not found.".to_string(),
                500 => "Internal server error. Try again later.".to_string(),
                502 => "The server is unavailable (bad gateway). Try again later.".to_string(),
                status => format!("Unexpected server error ({}).", status),
            },
        }
    }
}

/// Errors from the sync workflows.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Row not found: {0}")]
    RowNotFound(RowKey),

    #[error("No rows selected")]
    NothingSelected,
}

pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
