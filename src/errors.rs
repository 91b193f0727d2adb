//! Unified application error type.
//! All modules (db, core, cli, server) return AppError to keep the error
//! handling consistent and easy to manage.

use crate::core::backfill::BackfillReport;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Storage
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // ---------------------------
    // Validation (never persisted)
    // ---------------------------
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    // ---------------------------
    // Identity / authorization
    // ---------------------------
    #[error("Unauthorized: no authenticated actor")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // ---------------------------
    // Lookups
    // ---------------------------
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    // ---------------------------
    // Network (tracker → server)
    // ---------------------------
    #[error("Transport error: {0}")]
    Transport(String),

    // ---------------------------
    // Batch
    // ---------------------------
    #[error("Backfill aborted after {} inserted events: {reason}", report.inserted)]
    BackfillAborted {
        report: Box<BackfillReport>,
        reason: String,
    },

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // ---------------------------
    // Export errors
    // ---------------------------
    #[error("Export error: {0}")]
    Export(String),

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

impl AppError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        AppError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Storage and transport failures may succeed when the caller tries again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Db(_) | AppError::Storage(_) | AppError::Transport(_) | AppError::Io(_)
        )
    }

    /// Stable machine-readable code, used by the HTTP surface.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::Db(_) | AppError::Storage(_) | AppError::Migration(_) => "STORAGE_ERROR",
            AppError::Transport(_) => "TRANSPORT_ERROR",
            AppError::BackfillAborted { .. } => "BACKFILL_ABORTED",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io(_) | AppError::Export(_) | AppError::Other(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Validation {
            field: "payload",
            reason: e.to_string(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
