//! Error taxonomy for the dose engine.
//!
//! Validation errors surface synchronously at the boundary and are never
//! persisted. Dispatch and permission errors are contained by the reminder
//! loop and never escalate past a single tick.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DoseError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("notification permission denied")]
    PermissionDenied,

    #[error("notification dispatch failed: {0}")]
    Dispatch(String),

    #[error("confirmation already in progress for {0}")]
    ConfirmInFlight(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DoseError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn medication_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "medication",
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DoseError>;
