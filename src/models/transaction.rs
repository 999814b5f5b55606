//! Defines the transaction model, the core type of the ledger.

use serde::{Deserialize, Serialize};
use time::{Date, Time};

use super::UserId;

/// The ID of a transaction.
///
/// Assigned sequentially by the ledger and never reused within one session.
pub type TransactionId = i64;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");
time::serde::format_description!(clock_time, Time, "[hour]:[minute]");

/// Whether a transaction records money earned or money spent.
///
/// Exactly two variants: the kind determines the sign of the amount's
/// contribution to a balance (`+amount` for income, `-amount` for expense).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money was earned.
    Income,
    /// Money was spent.
    Expense,
}

impl TransactionKind {
    /// The sign of this kind's contribution to a balance.
    pub fn sign(self) -> f64 {
        match self {
            TransactionKind::Income => 1.0,
            TransactionKind::Expense => -1.0,
        }
    }

    /// The capitalized display name, as used in the CSV `Income/Expense`
    /// column and the statement `Type` column.
    pub fn label(self) -> &'static str {
        match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
        }
    }

    /// Parse a kind case-insensitively, e.g. `"Income"` or `"expense"`.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "income" => Some(TransactionKind::Income),
            "expense" => Some(TransactionKind::Expense),
            _ => None,
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// Whether the transaction is income or an expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// The ID of the user the transaction is recorded for.
    #[serde(rename = "userId")]
    pub user_id: UserId,
    /// How much money moved. Always positive, the direction comes from
    /// [Transaction::kind].
    pub amount: f64,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The calendar date the transaction happened on. No timezone.
    #[serde(with = "iso_date")]
    pub date: Date,
    /// The clock time the transaction happened at, if one was recorded.
    ///
    /// `None` means "no specific time". It sorts as midnight but is never
    /// displayed as 00:00.
    #[serde(with = "clock_time::option", default)]
    pub time: Option<Time>,
    /// An opaque reference to an attached image, if any. The binary payload
    /// lives with an external collaborator.
    #[serde(rename = "imageUrl", default)]
    pub image_url: Option<String>,
}

impl Transaction {
    /// The amount signed by the transaction kind: positive for income,
    /// negative for expenses.
    pub fn signed_amount(&self) -> f64 {
        self.amount * self.kind.sign()
    }

    /// The time used for ordering. Transactions without a recorded time sort
    /// as midnight, i.e. earliest in their day.
    pub fn sort_time(&self) -> Time {
        self.time.unwrap_or(Time::MIDNIGHT)
    }
}

/// The fields needed to record a transaction, before an ID is assigned.
///
/// Also used to edit a transaction in place: every field except the ID is
/// replaceable.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionData {
    /// Whether the transaction is income or an expense.
    pub kind: TransactionKind,
    /// The ID of the user the transaction is recorded for.
    pub user_id: UserId,
    /// How much money moved. Must be strictly positive.
    pub amount: f64,
    /// A text description of what the transaction was for. Must be non-empty.
    pub description: String,
    /// The calendar date the transaction happened on.
    pub date: Date,
    /// The clock time the transaction happened at, if one was recorded.
    pub time: Option<Time>,
    /// An opaque reference to an attached image, if any.
    pub image_url: Option<String>,
}

impl TransactionData {
    /// Finalize the data into a transaction with the given ID.
    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            kind: self.kind,
            user_id: self.user_id,
            amount: self.amount,
            description: self.description,
            date: self.date,
            time: self.time,
            image_url: self.image_url,
        }
    }
}

/// Format a clock time for display as `h:mm AM/PM`.
///
/// Only used for recorded times; "no specific time" renders as nothing at
/// all rather than as midnight.
pub fn format_time_12h(time: Time) -> String {
    let hour = time.hour();
    let suffix = if hour >= 12 { "PM" } else { "AM" };
    let display_hour = (hour + 11) % 12 + 1;

    format!("{}:{:02} {}", display_hour, time.minute(), suffix)
}

#[cfg(test)]
mod transaction_kind_tests {
    use super::TransactionKind;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(
            TransactionKind::parse("Income"),
            Some(TransactionKind::Income)
        );
        assert_eq!(
            TransactionKind::parse("EXPENSE"),
            Some(TransactionKind::Expense)
        );
        assert_eq!(
            TransactionKind::parse(" expense "),
            Some(TransactionKind::Expense)
        );
    }

    #[test]
    fn parse_rejects_unknown_kind() {
        assert_eq!(TransactionKind::parse("transfer"), None);
        assert_eq!(TransactionKind::parse(""), None);
    }

    #[test]
    fn sign_matches_kind() {
        assert_eq!(TransactionKind::Income.sign(), 1.0);
        assert_eq!(TransactionKind::Expense.sign(), -1.0);
    }
}
