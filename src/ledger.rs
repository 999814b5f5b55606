//! The authoritative in-memory ledger and its mutation rules.
//!
//! A [Ledger] owns the working set of users and transactions, validates
//! every mutation, persists it through a [LedgerStore] collaborator and only
//! then applies it in memory, so reads always reflect the last successful
//! write. Balances are recomputed from scratch after every mutation rather
//! than adjusted incrementally.

use time::OffsetDateTime;

use crate::{
    Error,
    balance::{BalanceSheet, recompute_balances},
    csv::{CsvExportFormat, CsvRowError, export_csv, parse_csv_rows},
    filter::{FilterSpec, GroupedHistory, filter_and_group},
    idmap::IdMap,
    models::{Transaction, TransactionData, TransactionId, User, UserId, find_user},
    statement::export_statement,
    stores::{LedgerStore, TransactionRecord},
};

/// The result of importing a CSV document into the ledger.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CsvImportOutcome {
    /// Users synthesized for account names that did not match any existing
    /// user, in order of first appearance.
    pub new_users: Vec<User>,
    /// The transactions created by the import, in file order.
    pub transactions: Vec<Transaction>,
    /// How many transactions were created.
    pub imported_count: usize,
    /// The data rows that were skipped, with line numbers.
    pub errors: Vec<CsvRowError>,
}

/// The working ledger, backed by a persistent store.
///
/// Mutations follow a strict order: validate, persist through the store,
/// apply in memory, recompute balances. A store failure therefore leaves the
/// in-memory state untouched.
#[derive(Debug)]
pub struct Ledger<S: LedgerStore> {
    store: S,
    users: Vec<User>,
    transactions: Vec<Transaction>,
    user_ids: IdMap,
    transaction_ids: IdMap,
    sheet: BalanceSheet,
}

impl<S: LedgerStore> Ledger<S> {
    /// Load the full ledger from `store`.
    ///
    /// Internal IDs are assigned in storage order, starting from 1 for both
    /// users and transactions. They are stable until the ledger is dropped
    /// but not across loads.
    ///
    /// # Errors
    /// Passes through any store error.
    pub fn load(store: S) -> Result<Self, Error> {
        let snapshot = store.load()?;

        let mut user_ids = IdMap::new();
        let users = snapshot
            .users
            .into_iter()
            .map(|stored| User::new(user_ids.to_internal(&stored.id), stored.name))
            .collect();

        let mut transaction_ids = IdMap::new();
        let transactions = snapshot
            .transactions
            .into_iter()
            .map(|stored| Transaction {
                id: transaction_ids.to_internal(&stored.id),
                kind: stored.data.kind,
                user_id: user_ids.to_internal(&stored.data.user_id),
                amount: stored.data.amount,
                description: stored.data.description,
                date: stored.data.date,
                time: stored.data.time,
                image_url: stored.data.image_url,
            })
            .collect();

        let mut ledger = Self {
            store,
            users,
            transactions,
            user_ids,
            transaction_ids,
            sheet: BalanceSheet::default(),
        };
        ledger.recompute();

        Ok(ledger)
    }

    fn recompute(&mut self) {
        self.sheet = recompute_balances(&mut self.users, &self.transactions);
    }

    /// The users in the ledger, with up-to-date balances.
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// The transactions in the ledger, in storage order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// The sum of all per-user balances.
    ///
    /// Transactions whose owner no longer exists contribute nothing; see
    /// [Ledger::integrity_warnings].
    pub fn total_balance(&self) -> f64 {
        self.sheet.total
    }

    /// The IDs of transactions whose owning user does not exist.
    ///
    /// These are kept in the data and surfaced here rather than silently
    /// dropped or counted into any balance.
    pub fn integrity_warnings(&self) -> &[TransactionId] {
        &self.sheet.orphaned
    }

    /// Filter, group and summarize the transaction history.
    pub fn history(&self, spec: &FilterSpec) -> GroupedHistory {
        filter_and_group(&self.transactions, &self.users, spec)
    }

    /// Serialize the (optionally per-user) transactions to CSV text.
    ///
    /// # Errors
    /// Returns [Error::EmptyExport] when there is nothing to export.
    pub fn export_csv(
        &self,
        filter_user: Option<UserId>,
        format: CsvExportFormat,
    ) -> Result<String, Error> {
        export_csv(&self.transactions, &self.users, filter_user, format)
    }

    /// Render the (optionally per-user) transactions as a `.docx` statement.
    ///
    /// # Errors
    /// Returns [Error::EmptyExport] when there is nothing to export and
    /// [Error::StatementError] when the document cannot be built.
    pub fn export_statement(
        &self,
        filter_user: Option<UserId>,
        generated_at: OffsetDateTime,
    ) -> Result<Vec<u8>, Error> {
        export_statement(&self.transactions, &self.users, filter_user, generated_at)
    }

    /// Add a user with the given name.
    ///
    /// # Errors
    /// Returns [Error::EmptyUserName] if `name` is blank after trimming, or
    /// a store error if persisting fails (in which case nothing is applied).
    pub fn add_user(&mut self, name: &str) -> Result<User, Error> {
        let name = name.trim();

        if name.is_empty() {
            return Err(Error::EmptyUserName);
        }

        let stored = self.store.create_user(name)?;
        let id = self.user_ids.to_internal(&stored.id);

        let user = User::new(id, name);
        self.users.push(user.clone());
        self.recompute();

        tracing::info!("added user {name:?} with ID {id}");
        Ok(user)
    }

    /// Rename an existing user.
    ///
    /// # Errors
    /// Returns [Error::UpdateMissingUser] if no user has the given ID and
    /// [Error::EmptyUserName] if the new name is blank after trimming.
    pub fn rename_user(&mut self, id: UserId, new_name: &str) -> Result<User, Error> {
        let new_name = new_name.trim();

        if new_name.is_empty() {
            return Err(Error::EmptyUserName);
        }

        let position = self
            .users
            .iter()
            .position(|user| user.id == id)
            .ok_or(Error::UpdateMissingUser)?;
        let external = self.user_ids.to_external(id).ok_or(Error::UnmappedId(id))?;

        self.store.update_user(external, new_name)?;

        self.users[position].name = new_name.to_owned();
        Ok(self.users[position].clone())
    }

    /// Delete a user along with all of their transactions.
    ///
    /// # Errors
    /// Returns [Error::DeleteMissingUser] if no user has the given ID; the
    /// absence is reported, never treated as a no-op.
    pub fn delete_user(&mut self, id: UserId) -> Result<(), Error> {
        if find_user(&self.users, id).is_none() {
            return Err(Error::DeleteMissingUser);
        }
        let external = self.user_ids.to_external(id).ok_or(Error::UnmappedId(id))?;

        self.store.delete_user(external)?;

        self.users.retain(|user| user.id != id);
        self.user_ids.remove_internal(id);

        let mut kept = Vec::with_capacity(self.transactions.len());
        for transaction in self.transactions.drain(..) {
            if transaction.user_id == id {
                self.transaction_ids.remove_internal(transaction.id);
            } else {
                kept.push(transaction);
            }
        }
        self.transactions = kept;
        self.recompute();

        Ok(())
    }

    fn validate_transaction(&self, data: &TransactionData) -> Result<(), Error> {
        if !(data.amount > 0.0) {
            return Err(Error::NonPositiveAmount(data.amount));
        }

        if data.description.trim().is_empty() {
            return Err(Error::EmptyDescription);
        }

        if find_user(&self.users, data.user_id).is_none() {
            return Err(Error::InvalidUser(data.user_id));
        }

        Ok(())
    }

    fn to_record(&self, data: &TransactionData) -> Result<TransactionRecord, Error> {
        let user_id = self
            .user_ids
            .to_external(data.user_id)
            .ok_or(Error::UnmappedId(data.user_id))?;

        Ok(TransactionRecord {
            kind: data.kind,
            user_id: user_id.to_owned(),
            amount: data.amount,
            description: data.description.clone(),
            date: data.date,
            time: data.time,
            image_url: data.image_url.clone(),
        })
    }

    /// Record a new transaction.
    ///
    /// # Errors
    /// Returns [Error::NonPositiveAmount], [Error::EmptyDescription] or
    /// [Error::InvalidUser] when validation fails; validation failures block
    /// the mutation entirely.
    pub fn add_transaction(&mut self, data: TransactionData) -> Result<Transaction, Error> {
        self.validate_transaction(&data)?;

        let record = self.to_record(&data)?;
        let stored = self.store.create_transaction(record)?;
        let id = self.transaction_ids.to_internal(&stored.id);

        let transaction = data.into_transaction(id);
        self.transactions.push(transaction.clone());
        self.recompute();

        Ok(transaction)
    }

    /// Replace every field of an existing transaction.
    ///
    /// # Errors
    /// Returns [Error::UpdateMissingTransaction] if no transaction has the
    /// given ID, plus the same validation errors as [Ledger::add_transaction].
    pub fn update_transaction(
        &mut self,
        id: TransactionId,
        data: TransactionData,
    ) -> Result<Transaction, Error> {
        let position = self
            .transactions
            .iter()
            .position(|transaction| transaction.id == id)
            .ok_or(Error::UpdateMissingTransaction)?;

        self.validate_transaction(&data)?;

        let record = self.to_record(&data)?;
        let external = self
            .transaction_ids
            .to_external(id)
            .ok_or(Error::UnmappedId(id))?;

        self.store.update_transaction(external, record)?;

        let transaction = data.into_transaction(id);
        self.transactions[position] = transaction.clone();
        self.recompute();

        Ok(transaction)
    }

    /// Delete a transaction.
    ///
    /// # Errors
    /// Returns [Error::DeleteMissingTransaction] if no transaction has the
    /// given ID.
    pub fn delete_transaction(&mut self, id: TransactionId) -> Result<(), Error> {
        let position = self
            .transactions
            .iter()
            .position(|transaction| transaction.id == id)
            .ok_or(Error::DeleteMissingTransaction)?;
        let external = self
            .transaction_ids
            .to_external(id)
            .ok_or(Error::UnmappedId(id))?;

        self.store.delete_transaction(external)?;

        self.transactions.remove(position);
        self.transaction_ids.remove_internal(id);
        self.recompute();

        Ok(())
    }

    /// Import transactions from CSV text.
    ///
    /// Account names are matched against existing users case-insensitively
    /// by exact name; unmatched names get a new user, which is visible to
    /// the rest of the batch. Rows are persisted one at a time in file
    /// order, so a store failure partway through keeps the rows already
    /// committed.
    ///
    /// Importing the same document twice duplicates its transactions; the
    /// importer deliberately does not deduplicate.
    ///
    /// # Errors
    /// Returns [Error::UnrecognizedCsvFormat] when the header does not
    /// match, in which case nothing is imported. Bad data rows are reported
    /// in [CsvImportOutcome::errors] instead of failing the batch.
    pub fn import_csv(&mut self, text: &str) -> Result<CsvImportOutcome, Error> {
        let import = parse_csv_rows(text)?;
        let mut outcome = CsvImportOutcome {
            errors: import.errors,
            ..Default::default()
        };

        for row in import.rows {
            let user_id = match self.resolve_account(&row.account) {
                Some(id) => id,
                None => {
                    let user = self.add_user(&row.account)?;
                    let id = user.id;
                    outcome.new_users.push(user);
                    id
                }
            };

            let transaction = self.add_transaction(TransactionData {
                kind: row.kind,
                user_id,
                amount: row.amount,
                description: row.description,
                date: row.date,
                time: row.time,
                image_url: None,
            })?;
            outcome.transactions.push(transaction);
        }

        outcome.imported_count = outcome.transactions.len();

        tracing::info!(
            "imported {} transactions, skipped {} rows",
            outcome.imported_count,
            outcome.errors.len()
        );
        Ok(outcome)
    }

    fn resolve_account(&self, name: &str) -> Option<UserId> {
        let name = name.to_lowercase();

        self.users
            .iter()
            .find(|user| user.name.to_lowercase() == name)
            .map(|user| user.id)
    }
}

#[cfg(test)]
mod ledger_tests {
    use time::macros::date;

    use crate::{
        Error,
        models::{TransactionData, TransactionKind},
        stores::JsonFileStore,
    };

    use super::Ledger;

    fn empty_ledger() -> Ledger<JsonFileStore> {
        Ledger::load(JsonFileStore::in_memory()).unwrap()
    }

    fn expense(user_id: i64, amount: f64, description: &str) -> TransactionData {
        TransactionData {
            kind: TransactionKind::Expense,
            user_id,
            amount,
            description: description.to_owned(),
            date: date!(2024 - 01 - 05),
            time: None,
            image_url: None,
        }
    }

    fn income(user_id: i64, amount: f64, description: &str) -> TransactionData {
        TransactionData {
            kind: TransactionKind::Income,
            ..expense(user_id, amount, description)
        }
    }

    #[test]
    fn add_user_assigns_sequential_ids() {
        let mut ledger = empty_ledger();

        let alice = ledger.add_user("Alice").unwrap();
        let bob = ledger.add_user(" Bob ").unwrap();

        assert_eq!(alice.id, 1);
        assert_eq!(bob.id, 2);
        assert_eq!(bob.name, "Bob", "names are stored trimmed");
    }

    #[test]
    fn blank_user_names_are_rejected() {
        let mut ledger = empty_ledger();

        assert_eq!(ledger.add_user("   "), Err(Error::EmptyUserName));
        assert_eq!(ledger.add_user(""), Err(Error::EmptyUserName));
        assert!(ledger.users().is_empty());
    }

    #[test]
    fn balances_follow_every_mutation() {
        let mut ledger = empty_ledger();
        let alice = ledger.add_user("Alice").unwrap();
        let bob = ledger.add_user("Bob").unwrap();

        ledger.add_transaction(income(alice.id, 1000.0, "Salary")).unwrap();
        ledger.add_transaction(expense(alice.id, 200.0, "Groceries")).unwrap();
        ledger.add_transaction(expense(bob.id, 150.0, "Petrol")).unwrap();

        assert_eq!(ledger.users()[0].balance, 800.0);
        assert_eq!(ledger.users()[1].balance, -150.0);
        assert_eq!(ledger.total_balance(), 650.0);
    }

    #[test]
    fn transaction_validation_blocks_the_mutation() {
        let mut ledger = empty_ledger();
        let alice = ledger.add_user("Alice").unwrap();

        assert_eq!(
            ledger.add_transaction(expense(alice.id, 0.0, "Groceries")),
            Err(Error::NonPositiveAmount(0.0))
        );
        assert_eq!(
            ledger.add_transaction(expense(alice.id, -5.0, "Groceries")),
            Err(Error::NonPositiveAmount(-5.0))
        );
        assert_eq!(
            ledger.add_transaction(expense(alice.id, 10.0, "  ")),
            Err(Error::EmptyDescription)
        );
        assert_eq!(
            ledger.add_transaction(expense(99, 10.0, "Groceries")),
            Err(Error::InvalidUser(99))
        );
        assert!(ledger.transactions().is_empty());
        assert_eq!(ledger.total_balance(), 0.0);
    }

    #[test]
    fn deleting_a_user_removes_their_transactions() {
        let mut ledger = empty_ledger();
        let alice = ledger.add_user("Alice").unwrap();
        let bob = ledger.add_user("Bob").unwrap();
        ledger.add_transaction(income(alice.id, 1000.0, "Salary")).unwrap();
        ledger.add_transaction(expense(bob.id, 150.0, "Petrol")).unwrap();

        ledger.delete_user(alice.id).unwrap();

        assert_eq!(ledger.users().len(), 1);
        assert_eq!(ledger.transactions().len(), 1);
        assert_eq!(ledger.transactions()[0].description, "Petrol");
        assert_eq!(ledger.total_balance(), -150.0);
        assert!(ledger.integrity_warnings().is_empty());
    }

    #[test]
    fn missing_records_are_reported_not_ignored() {
        let mut ledger = empty_ledger();

        assert_eq!(ledger.rename_user(1, "Alice"), Err(Error::UpdateMissingUser));
        assert_eq!(ledger.delete_user(1), Err(Error::DeleteMissingUser));
        assert_eq!(
            ledger.update_transaction(1, expense(1, 10.0, "Groceries")),
            Err(Error::UpdateMissingTransaction)
        );
        assert_eq!(
            ledger.delete_transaction(1),
            Err(Error::DeleteMissingTransaction)
        );
    }

    #[test]
    fn update_transaction_replaces_every_field() {
        let mut ledger = empty_ledger();
        let alice = ledger.add_user("Alice").unwrap();
        let bob = ledger.add_user("Bob").unwrap();
        let original = ledger
            .add_transaction(expense(alice.id, 200.0, "Groceries"))
            .unwrap();

        let updated = ledger
            .update_transaction(original.id, income(bob.id, 50.0, "Refund"))
            .unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.user_id, bob.id);
        assert_eq!(ledger.users()[0].balance, 0.0);
        assert_eq!(ledger.users()[1].balance, 50.0);
    }

    #[test]
    fn reload_preserves_records_and_reassigns_ids_in_order() {
        let mut store = JsonFileStore::in_memory();
        {
            let mut ledger = Ledger::load(&mut store).unwrap();
            let alice = ledger.add_user("Alice").unwrap();
            ledger.add_transaction(income(alice.id, 1000.0, "Salary")).unwrap();
        }

        let ledger = Ledger::load(&mut store).unwrap();

        assert_eq!(ledger.users().len(), 1);
        assert_eq!(ledger.users()[0].id, 1);
        assert_eq!(ledger.transactions().len(), 1);
        assert_eq!(ledger.transactions()[0].user_id, 1);
        assert_eq!(ledger.total_balance(), 1000.0);
    }

    #[test]
    fn import_csv_matches_existing_users_case_insensitively() {
        let mut ledger = empty_ledger();
        let alice = ledger.add_user("Alice").unwrap();

        let text = "Date,Account,Category,Note,INR,Income/Expense\n\
                    01/05/2024 09:00:00,ALICE,Other,Salary,1000,Income\n\
                    01/06/2024 00:00:00,Bob,Other,Petrol,150,Expense\n";

        let outcome = ledger.import_csv(text).unwrap();

        assert_eq!(outcome.imported_count, 2);
        assert_eq!(outcome.new_users.len(), 1);
        assert_eq!(outcome.new_users[0].name, "Bob");
        assert!(outcome.errors.is_empty());
        assert_eq!(ledger.transactions()[0].user_id, alice.id);
        assert_eq!(ledger.transactions()[1].time, None, "midnight imports as no time");
    }

    #[test]
    fn import_csv_matches_non_ascii_names_case_insensitively() {
        let mut ledger = empty_ledger();
        let jose = ledger.add_user("José").unwrap();

        let text = "Date,Account,Category,Note,INR,Income/Expense\n\
                    01/05/2024 09:00:00,JOSÉ,Other,Salary,1000,Income\n";

        let outcome = ledger.import_csv(text).unwrap();

        assert!(outcome.new_users.is_empty(), "no duplicate user for JOSÉ");
        assert_eq!(ledger.users().len(), 1);
        assert_eq!(ledger.transactions()[0].user_id, jose.id);
    }

    #[test]
    fn import_csv_collects_bad_rows_and_keeps_going() {
        let mut ledger = empty_ledger();

        let text = "Date,Account,Category,Note,INR,Income/Expense\n\
                    not-a-date,Alice,Other,Salary,1000,Income\n\
                    01/05/2024 09:00:00,Alice,Other,Groceries,-20,Expense\n\
                    01/06/2024 09:00:00,Alice,Other,Petrol,150,Expense\n";

        let outcome = ledger.import_csv(text).unwrap();

        assert_eq!(outcome.imported_count, 1);
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.errors[0].line, 2);
        assert_eq!(outcome.errors[1].line, 3);
        assert_eq!(ledger.transactions().len(), 1);
    }

    #[test]
    fn import_csv_rejects_foreign_headers() {
        let mut ledger = empty_ledger();

        let result = ledger.import_csv("Date,Payee,Amount\n01/05/2024,Shop,10\n");

        assert!(matches!(result, Err(Error::UnrecognizedCsvFormat(_))));
        assert!(ledger.transactions().is_empty());
    }

    #[test]
    fn importing_twice_duplicates_transactions() {
        let mut ledger = empty_ledger();
        let text = "Date,Account,Category,Note,INR,Income/Expense\n\
                    01/05/2024 09:00:00,Alice,Other,Salary,1000,Income\n";

        ledger.import_csv(text).unwrap();
        ledger.import_csv(text).unwrap();

        assert_eq!(ledger.transactions().len(), 2);
        assert_eq!(ledger.users().len(), 1, "the user is only synthesized once");
        assert_eq!(ledger.total_balance(), 2000.0);
    }
}
