//! Defines the app level error type and conversions from library errors.

use crate::models::{TransactionId, UserId};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An empty string was used to create or rename a user.
    #[error("user name cannot be empty")]
    EmptyUserName,

    /// An empty string was used as a transaction description.
    #[error("transaction description cannot be empty")]
    EmptyDescription,

    /// A zero or negative amount was used to create or edit a transaction.
    ///
    /// Amounts record how much money moved, the direction is carried by the
    /// transaction kind, so amounts must be strictly positive.
    #[error("transaction amounts must be positive, got {0}")]
    NonPositiveAmount(f64),

    /// A date string could not be parsed as a calendar date.
    ///
    /// Callers should pass in the string that caused the error.
    #[error("could not parse \"{0}\" as a date")]
    InvalidDate(String),

    /// A clock time string could not be parsed as `HH:MM`.
    #[error("could not parse \"{0}\" as a time of day")]
    InvalidTime(String),

    /// The user ID used to create a transaction did not match a valid user.
    #[error("the user ID {0} does not refer to a valid user")]
    InvalidUser(UserId),

    /// Tried to rename a user that does not exist.
    #[error("tried to rename a user that is not in the ledger")]
    UpdateMissingUser,

    /// Tried to delete a user that does not exist.
    #[error("tried to delete a user that is not in the ledger")]
    DeleteMissingUser,

    /// Tried to update a transaction that does not exist.
    #[error("tried to update a transaction that is not in the ledger")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist.
    #[error("tried to delete a transaction that is not in the ledger")]
    DeleteMissingTransaction,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The CSV header row did not match the known import format.
    ///
    /// The importer recognizes exactly one format, identified by a column
    /// literally named `Income/Expense`. Any other header shape imports
    /// zero rows.
    #[error("unrecognized CSV format: {0}")]
    UnrecognizedCsvFormat(String),

    /// An export was requested for an empty transaction set.
    ///
    /// Reported to the caller instead of silently producing an empty file.
    #[error("there are no transactions to export")]
    EmptyExport,

    /// An internal ID has no binding to a backing store identifier.
    ///
    /// This is a fatal precondition failure for any mutation that has to
    /// talk to the backing store: the binding is rebuilt on every full load,
    /// so a missing entry means the record was never loaded or was deleted.
    #[error("the ID {0} has no binding to a backing store identifier")]
    UnmappedId(TransactionId),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while serializing or deserializing the JSON store.
    #[error("could not read or write the ledger as JSON: {0}")]
    JsonSerializationError(String),

    /// An error occurred while reading or writing a file.
    #[error("an I/O error occurred: {0}")]
    Io(String),

    /// An error occurred while packing the statement document.
    #[error("could not build the statement document: {0}")]
    StatementError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Error::Io(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JsonSerializationError(value.to_string())
    }
}
