//! Splitledger is a ledger for shared and personal expenses.
//!
//! The library keeps an authoritative in-memory ledger of users and their
//! transactions, recomputes balances after every mutation, and persists
//! everything through a pluggable backing store (a JSON file or a SQLite
//! database). On top of that sit a filterable transaction history, a CSV
//! statement codec and a Word-document statement export.

#![warn(missing_docs)]

mod balance;
mod csv;
mod error;
mod filter;
mod idmap;
mod ledger;
mod models;
mod money;
mod statement;

pub mod stores;

pub use balance::{BalanceSheet, recompute_balances, signed_sum};
pub use self::csv::{
    CsvExportFormat, CsvImport, CsvRow, CsvRowError, csv_export_filename, export_csv,
    parse_csv_rows,
};
pub use error::Error;
pub use filter::{
    DayGroup, FilterSpec, FilterSummary, GroupedHistory, Window, filter_and_group, week_of_month,
};
pub use idmap::{ExternalId, IdMap};
pub use ledger::{CsvImportOutcome, Ledger};
pub use models::{
    Transaction, TransactionData, TransactionId, TransactionKind, User, UserId, find_user,
    format_time_12h, user_display_name,
};
pub use money::format_inr;
pub use statement::{export_statement, statement_filename};
