//! Implements a JSON file backed ledger store.
//!
//! The whole ledger lives in a single JSON document that is rewritten after
//! every mutation. Identifiers are small integers minted from counters kept
//! in the document, exposed to callers as their decimal string form.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    models::{Transaction, User},
    stores::{LedgerSnapshot, LedgerStore, StoredTransaction, StoredUser, TransactionRecord},
};

/// The on-disk shape of the ledger.
#[derive(Debug, Serialize, Deserialize)]
struct LedgerDocument {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    transactions: Vec<Transaction>,
    #[serde(default = "first_id")]
    next_user_id: i64,
    #[serde(default = "first_id")]
    next_transaction_id: i64,
}

fn first_id() -> i64 {
    1
}

impl Default for LedgerDocument {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            transactions: Vec::new(),
            next_user_id: 1,
            next_transaction_id: 1,
        }
    }
}

/// Stores the ledger in a single JSON file.
///
/// Counters only ever move forward, so identifiers are never reused even
/// after deletions.
#[derive(Debug)]
pub struct JsonFileStore {
    path: Option<PathBuf>,
    document: LedgerDocument,
}

impl JsonFileStore {
    /// Open the ledger file at `path`, creating an empty ledger if the file
    /// does not exist yet.
    ///
    /// # Errors
    /// Returns [Error::Io] if the file cannot be read and
    /// [Error::JsonSerializationError] if its contents are not a valid
    /// ledger document.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        let document = if path.exists() {
            let text = fs::read_to_string(&path)?;

            if text.trim().is_empty() {
                LedgerDocument::default()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            LedgerDocument::default()
        };

        Ok(Self {
            path: Some(path),
            document,
        })
    }

    /// Create a store that never touches the file system.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            document: LedgerDocument::default(),
        }
    }

    fn persist(&self) -> Result<(), Error> {
        if let Some(path) = &self.path {
            let text = serde_json::to_string_pretty(&self.document)?;
            fs::write(path, text)?;
        }

        Ok(())
    }
}

/// Parse a store-issued identifier back into the document's integer form.
///
/// Identifiers that this store never issued cannot refer to a record, so a
/// parse failure reports the same way as a missing record.
fn parse_id(id: &str) -> Result<i64, Error> {
    id.parse().map_err(|_| Error::NotFound)
}

fn to_stored(transaction: &Transaction) -> StoredTransaction {
    StoredTransaction {
        id: transaction.id.to_string(),
        data: TransactionRecord {
            kind: transaction.kind,
            user_id: transaction.user_id.to_string(),
            amount: transaction.amount,
            description: transaction.description.clone(),
            date: transaction.date,
            time: transaction.time,
            image_url: transaction.image_url.clone(),
        },
    }
}

fn to_model(id: i64, record: TransactionRecord) -> Result<Transaction, Error> {
    Ok(Transaction {
        id,
        kind: record.kind,
        user_id: parse_id(&record.user_id)?,
        amount: record.amount,
        description: record.description,
        date: record.date,
        time: record.time,
        image_url: record.image_url,
    })
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<LedgerSnapshot, Error> {
        Ok(LedgerSnapshot {
            users: self
                .document
                .users
                .iter()
                .map(|user| StoredUser {
                    id: user.id.to_string(),
                    name: user.name.clone(),
                })
                .collect(),
            transactions: self.document.transactions.iter().map(to_stored).collect(),
        })
    }

    fn create_user(&mut self, name: &str) -> Result<StoredUser, Error> {
        let id = self.document.next_user_id;
        self.document.next_user_id += 1;
        self.document.users.push(User::new(id, name));
        self.persist()?;

        Ok(StoredUser {
            id: id.to_string(),
            name: name.to_owned(),
        })
    }

    fn update_user(&mut self, id: &str, name: &str) -> Result<(), Error> {
        let id = parse_id(id)?;
        let user = self
            .document
            .users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or(Error::NotFound)?;

        user.name = name.to_owned();
        self.persist()
    }

    fn delete_user(&mut self, id: &str) -> Result<(), Error> {
        let id = parse_id(id)?;

        if !self.document.users.iter().any(|user| user.id == id) {
            return Err(Error::NotFound);
        }

        self.document.users.retain(|user| user.id != id);
        self.document
            .transactions
            .retain(|transaction| transaction.user_id != id);
        self.persist()
    }

    fn create_transaction(&mut self, record: TransactionRecord) -> Result<StoredTransaction, Error> {
        let id = self.document.next_transaction_id;
        let transaction = to_model(id, record)?;
        self.document.next_transaction_id += 1;

        let stored = to_stored(&transaction);
        self.document.transactions.push(transaction);
        self.persist()?;

        Ok(stored)
    }

    fn update_transaction(&mut self, id: &str, record: TransactionRecord) -> Result<(), Error> {
        let id = parse_id(id)?;
        let replacement = to_model(id, record)?;
        let transaction = self
            .document
            .transactions
            .iter_mut()
            .find(|transaction| transaction.id == id)
            .ok_or(Error::NotFound)?;

        *transaction = replacement;
        self.persist()
    }

    fn delete_transaction(&mut self, id: &str) -> Result<(), Error> {
        let id = parse_id(id)?;
        let before = self.document.transactions.len();
        self.document
            .transactions
            .retain(|transaction| transaction.id != id);

        if self.document.transactions.len() == before {
            return Err(Error::NotFound);
        }

        self.persist()
    }
}

#[cfg(test)]
mod json_file_store_tests {
    use time::macros::{date, time};

    use crate::{
        Error,
        models::TransactionKind,
        stores::{LedgerStore, TransactionRecord},
    };

    use super::JsonFileStore;

    fn record(user_id: &str) -> TransactionRecord {
        TransactionRecord {
            kind: TransactionKind::Expense,
            user_id: user_id.to_owned(),
            amount: 42.5,
            description: "Groceries".to_owned(),
            date: date!(2024 - 01 - 05),
            time: Some(time!(14:30)),
            image_url: None,
        }
    }

    #[test]
    fn create_user_mints_sequential_string_ids() {
        let mut store = JsonFileStore::in_memory();

        let alice = store.create_user("Alice").unwrap();
        let bob = store.create_user("Bob").unwrap();

        assert_eq!(alice.id, "1");
        assert_eq!(bob.id, "2");
        assert_eq!(bob.name, "Bob");
    }

    #[test]
    fn deleted_user_ids_are_not_reused() {
        let mut store = JsonFileStore::in_memory();
        let alice = store.create_user("Alice").unwrap();

        store.delete_user(&alice.id).unwrap();
        let bob = store.create_user("Bob").unwrap();

        assert_eq!(bob.id, "2");
    }

    #[test]
    fn delete_user_removes_their_transactions() {
        let mut store = JsonFileStore::in_memory();
        let alice = store.create_user("Alice").unwrap();
        let bob = store.create_user("Bob").unwrap();
        store.create_transaction(record(&alice.id)).unwrap();
        let kept = store.create_transaction(record(&bob.id)).unwrap();

        store.delete_user(&alice.id).unwrap();

        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.transactions.len(), 1);
        assert_eq!(snapshot.transactions[0].id, kept.id);
    }

    #[test]
    fn mutating_missing_records_is_not_found() {
        let mut store = JsonFileStore::in_memory();

        assert_eq!(store.update_user("1", "Alice"), Err(Error::NotFound));
        assert_eq!(store.delete_user("1"), Err(Error::NotFound));
        assert_eq!(
            store.update_transaction("1", record("1")),
            Err(Error::NotFound)
        );
        assert_eq!(store.delete_transaction("1"), Err(Error::NotFound));
        assert_eq!(store.update_user("not-a-number", "Alice"), Err(Error::NotFound));
    }

    #[test]
    fn load_round_trips_created_records() {
        let mut store = JsonFileStore::in_memory();
        let alice = store.create_user("Alice").unwrap();
        let created = store.create_transaction(record(&alice.id)).unwrap();

        let snapshot = store.load().unwrap();

        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.users[0].name, "Alice");
        assert_eq!(snapshot.transactions, vec![created]);
    }

    #[test]
    fn reopening_the_file_restores_the_ledger() {
        let directory = std::env::temp_dir().join(format!(
            "splitledger_store_test_{}_{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        std::fs::create_dir_all(&directory).unwrap();
        let path = directory.join("ledger.json");

        {
            let mut store = JsonFileStore::open(&path).unwrap();
            let alice = store.create_user("Alice").unwrap();
            store.create_transaction(record(&alice.id)).unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        let snapshot = store.load().unwrap();

        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.transactions.len(), 1);
        assert_eq!(snapshot.transactions[0].data.description, "Groceries");

        std::fs::remove_dir_all(&directory).unwrap();
    }

    #[test]
    fn opening_a_missing_file_starts_empty() {
        let path = std::env::temp_dir().join("splitledger_does_not_exist.json");
        let _ = std::fs::remove_file(&path);

        let store = JsonFileStore::open(&path).unwrap();

        assert_eq!(store.load().unwrap(), Default::default());
    }
}
