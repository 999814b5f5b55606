//! Contains the backing store trait and its implementations.
//!
//! Stores persist records and issue identifiers, nothing more. They know
//! nothing about balances, validation or import semantics; that all lives in
//! the [ledger](crate::ledger). Identifiers handed out by a store are opaque
//! strings, reconciled to small integers by the ledger's
//! [IdMap](crate::idmap::IdMap).

mod json;
mod sqlite;

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

use time::{Date, Time};

use crate::{Error, idmap::ExternalId, models::TransactionKind};

/// A user record as held by a backing store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredUser {
    /// The store-issued identifier.
    pub id: ExternalId,
    /// The user's display name.
    pub name: String,
}

/// The data of a transaction, without an identifier.
///
/// This is what callers hand to [LedgerStore::create_transaction]; the store
/// issues the identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    /// Whether the transaction adds to or subtracts from a balance.
    pub kind: TransactionKind,
    /// The store-issued identifier of the owning user.
    pub user_id: ExternalId,
    /// The unsigned amount of money moved.
    pub amount: f64,
    /// A free-text description.
    pub description: String,
    /// The calendar date of the transaction.
    pub date: Date,
    /// The clock time of the transaction, if one was recorded.
    pub time: Option<Time>,
    /// An optional receipt image reference.
    pub image_url: Option<String>,
}

/// A transaction record as held by a backing store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTransaction {
    /// The store-issued identifier.
    pub id: ExternalId,
    /// The transaction data.
    pub data: TransactionRecord,
}

/// Everything a backing store holds, in stable storage order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerSnapshot {
    /// All persisted users.
    pub users: Vec<StoredUser>,
    /// All persisted transactions.
    pub transactions: Vec<StoredTransaction>,
}

/// Handles persistence of users and transactions.
///
/// Implementations must issue an identifier for every created record and
/// must return the same records, in the same order, from [LedgerStore::load]
/// until the next mutation.
pub trait LedgerStore {
    /// Retrieve every persisted record.
    fn load(&self) -> Result<LedgerSnapshot, Error>;

    /// Create a new user with the given name and return it with its
    /// store-issued identifier.
    fn create_user(&mut self, name: &str) -> Result<StoredUser, Error>;

    /// Replace the name of the user with the given identifier.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if no such user exists.
    fn update_user(&mut self, id: &str, name: &str) -> Result<(), Error>;

    /// Delete the user with the given identifier along with all of their
    /// transactions.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if no such user exists.
    fn delete_user(&mut self, id: &str) -> Result<(), Error>;

    /// Persist a new transaction and return it with its store-issued
    /// identifier.
    fn create_transaction(&mut self, record: TransactionRecord) -> Result<StoredTransaction, Error>;

    /// Replace the data of the transaction with the given identifier.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if no such transaction exists.
    fn update_transaction(&mut self, id: &str, record: TransactionRecord) -> Result<(), Error>;

    /// Delete the transaction with the given identifier.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if no such transaction exists.
    fn delete_transaction(&mut self, id: &str) -> Result<(), Error>;
}

// Lets callers keep ownership of a store across ledger sessions.
impl<S: LedgerStore> LedgerStore for &mut S {
    fn load(&self) -> Result<LedgerSnapshot, Error> {
        (**self).load()
    }

    fn create_user(&mut self, name: &str) -> Result<StoredUser, Error> {
        (**self).create_user(name)
    }

    fn update_user(&mut self, id: &str, name: &str) -> Result<(), Error> {
        (**self).update_user(id, name)
    }

    fn delete_user(&mut self, id: &str) -> Result<(), Error> {
        (**self).delete_user(id)
    }

    fn create_transaction(&mut self, record: TransactionRecord) -> Result<StoredTransaction, Error> {
        (**self).create_transaction(record)
    }

    fn update_transaction(&mut self, id: &str, record: TransactionRecord) -> Result<(), Error> {
        (**self).update_transaction(id, record)
    }

    fn delete_transaction(&mut self, id: &str) -> Result<(), Error> {
        (**self).delete_transaction(id)
    }
}
