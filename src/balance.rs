//! Pure recomputation of per-user balances and the grand total from the
//! transaction log.
//!
//! Balances are derived data: they are wiped and rebuilt from scratch after
//! every mutation and full reload. The recomputation is O(n) over the whole
//! transaction set, which is fine at household-ledger volumes.

use crate::models::{Transaction, TransactionId, User, find_user};

/// The result of recomputing balances over the full transaction set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BalanceSheet {
    /// The grand total: the sum of all per-user balances.
    ///
    /// Defined strictly as the sum over per-user balances, so orphaned
    /// transactions contribute nothing to it. This is equivalent to the
    /// signed sum over all transactions whose user exists, regardless of
    /// the order users are enumerated in.
    pub total: f64,
    /// Transactions whose `user_id` matches no known user.
    ///
    /// A data-integrity condition: these transactions stay in the ledger and
    /// must be surfaced to the caller, but they are excluded from every
    /// balance by definition.
    pub orphaned: Vec<TransactionId>,
}

/// Recompute every user's balance from the transaction set.
///
/// Each user's balance becomes the sum of their income amounts minus the sum
/// of their expense amounts. Transactions referencing an unknown user are
/// collected in [BalanceSheet::orphaned] and logged as a warning rather than
/// silently dropped.
pub fn recompute_balances(users: &mut [User], transactions: &[Transaction]) -> BalanceSheet {
    for user in users.iter_mut() {
        user.balance = 0.0;
    }

    let mut orphaned = Vec::new();

    for transaction in transactions {
        match users.iter_mut().find(|user| user.id == transaction.user_id) {
            Some(user) => user.balance += transaction.signed_amount(),
            None => {
                tracing::warn!(
                    "transaction {} references unknown user {}; excluded from balances",
                    transaction.id,
                    transaction.user_id
                );
                orphaned.push(transaction.id);
            }
        }
    }

    let total = users.iter().map(|user| user.balance).sum();

    BalanceSheet { total, orphaned }
}

/// The signed sum over the transactions whose user exists.
///
/// Used to check the invariant that the grand total agrees with the
/// transaction log independently of per-user enumeration.
pub fn signed_sum(users: &[User], transactions: &[Transaction]) -> f64 {
    transactions
        .iter()
        .filter(|transaction| find_user(users, transaction.user_id).is_some())
        .map(Transaction::signed_amount)
        .sum()
}
