//! The domain models for the ledger: users and the transactions recorded
//! against them.

mod transaction;
mod user;

pub use transaction::{
    Transaction, TransactionData, TransactionId, TransactionKind, format_time_12h,
};
pub use user::{User, UserId, find_user, user_display_name};
