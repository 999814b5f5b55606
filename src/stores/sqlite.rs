//! Implements a SQLite backed ledger store.
//!
//! Records are keyed by UUIDs so identifiers stay unique across accounts and
//! sessions. Every row carries an `account` column and every statement is
//! scoped to the store's account, so multiple ledgers can share one database
//! file without seeing each other.

use std::path::Path;

use rusqlite::{Connection, Row};
use time::{Date, Time};
use uuid::Uuid;

use crate::{
    Error,
    models::TransactionKind,
    stores::{LedgerSnapshot, LedgerStore, StoredTransaction, StoredUser, TransactionRecord},
};

/// Stores the ledger in a SQLite database, scoped to one account.
#[derive(Debug)]
pub struct SqliteStore {
    connection: Connection,
    account: String,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and scope the store to
    /// `account`.
    ///
    /// # Errors
    /// Returns [Error::SqlError] if the database cannot be opened or the
    /// schema cannot be created.
    pub fn open<P: AsRef<Path>>(path: P, account: &str) -> Result<Self, Error> {
        let connection = Connection::open(path)?;

        Self::new(connection, account)
    }

    /// Create a store backed by an in-memory database.
    ///
    /// # Errors
    /// Returns [Error::SqlError] if the schema cannot be created.
    pub fn open_in_memory(account: &str) -> Result<Self, Error> {
        let connection = Connection::open_in_memory()?;

        Self::new(connection, account)
    }

    fn new(connection: Connection, account: &str) -> Result<Self, Error> {
        connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS \"user\" (
                id TEXT PRIMARY KEY,
                account TEXT NOT NULL,
                name TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS \"transaction\" (
                id TEXT PRIMARY KEY,
                account TEXT NOT NULL,
                kind TEXT NOT NULL,
                user_id TEXT NOT NULL REFERENCES \"user\"(id),
                amount REAL NOT NULL,
                description TEXT NOT NULL,
                date TEXT NOT NULL,
                time TEXT,
                image_url TEXT
            );",
        )?;

        Ok(Self {
            connection,
            account: account.to_owned(),
        })
    }

    fn map_user_row(row: &Row) -> Result<StoredUser, rusqlite::Error> {
        Ok(StoredUser {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }

    fn map_transaction_row(row: &Row) -> Result<StoredTransaction, rusqlite::Error> {
        let kind_text: String = row.get(1)?;
        let kind = TransactionKind::parse(&kind_text).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                format!("unknown transaction kind {kind_text:?}").into(),
            )
        })?;
        let time_text: Option<String> = row.get(6)?;
        let time = match time_text {
            Some(text) => Some(parse_clock_column(&text).map_err(|_| {
                rusqlite::Error::FromSqlConversionFailure(
                    6,
                    rusqlite::types::Type::Text,
                    format!("unknown clock time {text:?}").into(),
                )
            })?),
            None => None,
        };

        Ok(StoredTransaction {
            id: row.get(0)?,
            data: TransactionRecord {
                kind,
                user_id: row.get(2)?,
                amount: row.get(3)?,
                description: row.get(4)?,
                date: row.get::<_, Date>(5)?,
                time,
                image_url: row.get(7)?,
            },
        })
    }
}

fn kind_column(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Income => "income",
        TransactionKind::Expense => "expense",
    }
}

fn clock_column(time: Option<Time>) -> Option<String> {
    time.map(|time| format!("{:02}:{:02}", time.hour(), time.minute()))
}

fn parse_clock_column(text: &str) -> Result<Time, Error> {
    let (hour, minute) = text
        .split_once(':')
        .ok_or_else(|| Error::InvalidTime(text.to_owned()))?;
    let hour = hour
        .parse()
        .map_err(|_| Error::InvalidTime(text.to_owned()))?;
    let minute = minute
        .parse()
        .map_err(|_| Error::InvalidTime(text.to_owned()))?;

    Time::from_hms(hour, minute, 0).map_err(|_| Error::InvalidTime(text.to_owned()))
}

impl LedgerStore for SqliteStore {
    fn load(&self) -> Result<LedgerSnapshot, Error> {
        let users = self
            .connection
            .prepare("SELECT id, name FROM \"user\" WHERE account = ?1 ORDER BY rowid")?
            .query_map([&self.account], Self::map_user_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let transactions = self
            .connection
            .prepare(
                "SELECT id, kind, user_id, amount, description, date, time, image_url
                 FROM \"transaction\" WHERE account = ?1 ORDER BY rowid",
            )?
            .query_map([&self.account], Self::map_transaction_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LedgerSnapshot {
            users,
            transactions,
        })
    }

    fn create_user(&mut self, name: &str) -> Result<StoredUser, Error> {
        let id = Uuid::new_v4().to_string();

        self.connection
            .prepare("INSERT INTO \"user\" (id, account, name) VALUES (?1, ?2, ?3)")?
            .execute((&id, &self.account, name))?;

        Ok(StoredUser {
            id,
            name: name.to_owned(),
        })
    }

    fn update_user(&mut self, id: &str, name: &str) -> Result<(), Error> {
        let affected = self
            .connection
            .prepare("UPDATE \"user\" SET name = ?1 WHERE account = ?2 AND id = ?3")?
            .execute((name, &self.account, id))?;

        if affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    fn delete_user(&mut self, id: &str) -> Result<(), Error> {
        let tx = self.connection.unchecked_transaction()?;

        // Dependents first so the user row never outlives its transactions.
        tx.execute(
            "DELETE FROM \"transaction\" WHERE account = ?1 AND user_id = ?2",
            (&self.account, id),
        )?;
        let affected = tx.execute(
            "DELETE FROM \"user\" WHERE account = ?1 AND id = ?2",
            (&self.account, id),
        )?;

        if affected == 0 {
            // Dropping the transaction rolls it back.
            return Err(Error::NotFound);
        }

        tx.commit()?;
        Ok(())
    }

    fn create_transaction(&mut self, record: TransactionRecord) -> Result<StoredTransaction, Error> {
        let id = Uuid::new_v4().to_string();

        self.connection
            .prepare(
                "INSERT INTO \"transaction\"
                 (id, account, kind, user_id, amount, description, date, time, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?
            .execute((
                &id,
                &self.account,
                kind_column(record.kind),
                &record.user_id,
                record.amount,
                &record.description,
                record.date,
                clock_column(record.time),
                &record.image_url,
            ))?;

        Ok(StoredTransaction { id, data: record })
    }

    fn update_transaction(&mut self, id: &str, record: TransactionRecord) -> Result<(), Error> {
        let affected = self
            .connection
            .prepare(
                "UPDATE \"transaction\"
                 SET kind = ?1, user_id = ?2, amount = ?3, description = ?4,
                     date = ?5, time = ?6, image_url = ?7
                 WHERE account = ?8 AND id = ?9",
            )?
            .execute((
                kind_column(record.kind),
                &record.user_id,
                record.amount,
                &record.description,
                record.date,
                clock_column(record.time),
                &record.image_url,
                &self.account,
                id,
            ))?;

        if affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    fn delete_transaction(&mut self, id: &str) -> Result<(), Error> {
        let affected = self
            .connection
            .prepare("DELETE FROM \"transaction\" WHERE account = ?1 AND id = ?2")?
            .execute((&self.account, id))?;

        if affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }
}
