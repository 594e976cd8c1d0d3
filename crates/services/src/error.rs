//! Shared error types for the services crate.

use thiserror::Error;

use prep_core::TransitionError;
use prep_core::model::{ItemSetError, SessionConfigError, SessionSummaryError};
use storage::repository::StorageError;

/// Errors emitted by item bank providers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ItemBankError {
    #[error("item bank unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no items available for session")]
    Empty,
    #[error("session limit {got} exceeds the maximum of {max} items")]
    LimitTooLarge { got: u32, max: u32 },
    #[error("item bank unavailable and fallback disabled")]
    BankUnavailable(#[source] ItemBankError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    ItemSet(#[from] ItemSetError),
    #[error(transparent)]
    Config(#[from] SessionConfigError),
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while exporting or importing summaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    #[error("unknown export format: {0}")]
    UnknownFormat(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("csv output is not valid utf-8")]
    Encoding,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while reading engine settings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("invalid {var} value: {raw}")]
    Invalid { var: &'static str, raw: String },
}
