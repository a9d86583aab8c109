use thiserror::Error;
use uuid::Uuid;

use crate::spreadsheet::SpreadsheetError;

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// A required field was left empty on an explicit add or edit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("first name is required")]
    MissingFirstName,
    #[error("email is required")]
    MissingEmail,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("client {0} not found")]
    ClientNotFound(Uuid),

    #[error("no client matches id '{0}'")]
    NoMatchingId(String),

    #[error("id prefix '{0}' matches more than one client")]
    AmbiguousId(String),

    #[error("note text cannot be empty")]
    EmptyNote,

    #[error("another import is waiting for a column mapping")]
    ImportInProgress,

    #[error("there is no pending import")]
    NoPendingImport,

    #[error("header '{0}' is not part of the pending import")]
    UnknownHeader(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] SpreadsheetError),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
