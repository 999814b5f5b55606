//! Defines the user model.
//!
//! A "user" is whoever a transaction is recorded for: a household member, a
//! flatmate, or just a bucket such as "Groceries". Users do not log in and
//! carry no credentials.

use serde::{Deserialize, Serialize};

/// The ID of a user.
///
/// Assigned sequentially by the ledger and never reused within one session.
pub type UserId = i64;

/// A person or category that transactions are recorded against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The ID of the user.
    pub id: UserId,
    /// The display name of the user.
    ///
    /// Not required to be unique, but CSV import matches names
    /// case-insensitively.
    pub name: String,
    /// The net signed sum of the user's transactions.
    ///
    /// Derived from the transaction log and recomputed after every mutation,
    /// never set from user input. The stored value is only a cache for
    /// display.
    #[serde(default)]
    pub balance: f64,
}

impl User {
    /// Create a user with a zero balance.
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            balance: 0.0,
        }
    }
}

/// Look up a user by ID.
pub fn find_user(users: &[User], id: UserId) -> Option<&User> {
    users.iter().find(|user| user.id == id)
}

/// The display name for a transaction's owner, or `"N/A"` when the owner no
/// longer exists.
///
/// A dangling user reference is an integrity condition, not a crash: history
/// views and exports must still render the transaction.
pub fn user_display_name(users: &[User], id: UserId) -> &str {
    find_user(users, id).map_or("N/A", |user| user.name.as_str())
}
