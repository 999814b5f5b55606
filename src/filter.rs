//! Filtering and date-grouping of the transaction history.
//!
//! [filter_and_group] is side-effect-free and restartable: the same inputs
//! always produce the same output, and nothing here reads the wall clock.
//! Time-based windows are supplied by the caller.

use time::Date;

use crate::models::{Transaction, TransactionKind, User, find_user};

/// A date window over the transaction history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    /// No date filtering.
    #[default]
    Total,
    /// Transactions within one calendar year.
    Year {
        /// The calendar year, e.g. 2024.
        year: i32,
    },
    /// Transactions within one calendar month.
    Month {
        /// The calendar year.
        year: i32,
        /// The zero-based calendar month (0 = January).
        month: u8,
    },
    /// Transactions within one "week of the month".
    ///
    /// A week here is the simple `ceil(day / 7)` bucket: days 1-7 are week 1,
    /// days 8-14 are week 2, and so on. Week 5 holds the 1-3 trailing days of
    /// longer months. This is intentionally not an ISO calendar week; keep
    /// this exact definition for compatibility.
    Week {
        /// The calendar year.
        year: i32,
        /// The zero-based calendar month (0 = January).
        month: u8,
        /// The one-based week-of-month bucket, 1 to 5.
        week: u8,
    },
}

impl Window {
    fn contains(self, date: Date) -> bool {
        match self {
            Window::Total => true,
            Window::Year { year } => date.year() == year,
            Window::Month { year, month } => {
                date.year() == year && date.month() as u8 - 1 == month
            }
            Window::Week { year, month, week } => {
                date.year() == year
                    && date.month() as u8 - 1 == month
                    && week_of_month(date.day()) == week
            }
        }
    }
}

/// The `ceil(day / 7)` week-of-month bucket for a day of the month.
pub fn week_of_month(day: u8) -> u8 {
    (day - 1) / 7 + 1
}

/// What the history view should show.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterSpec {
    /// The date window to filter by.
    pub window: Window,
    /// Case-insensitive substring matched against the transaction
    /// description or the owning user's name. Empty matches everything.
    pub search_text: String,
}

/// One day of transaction history.
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    /// The date shared by every transaction in the group.
    pub date: Date,
    /// The day's transactions, ordered by time descending. Transactions
    /// without a recorded time sort as midnight, i.e. last.
    pub items: Vec<Transaction>,
}

/// Income, expense, and net totals over the filtered subset only.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilterSummary {
    /// The sum of matching income amounts.
    pub income: f64,
    /// The sum of matching expense amounts.
    pub expense: f64,
    /// Income minus expenses.
    pub net: f64,
}

/// A filtered, date-grouped view of the transaction history.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedHistory {
    /// The matching transactions grouped by date, most recent day first.
    pub groups: Vec<DayGroup>,
    /// Totals over the matching transactions only.
    pub summary: FilterSummary,
    /// How many transactions matched the filter.
    pub match_count: usize,
}

/// Filter transactions by `spec`, then group them by date.
///
/// Groups are ordered by date descending; within a group, by time descending
/// with missing times sorting as midnight. The summary covers the filtered
/// subset, not the full transaction set. Search text matches the description
/// or the owning user's name; transactions whose owner no longer exists only
/// match on their description.
pub fn filter_and_group(
    transactions: &[Transaction],
    users: &[User],
    spec: &FilterSpec,
) -> GroupedHistory {
    let needle = spec.search_text.trim().to_lowercase();

    let mut matches: Vec<Transaction> = transactions
        .iter()
        .filter(|transaction| spec.window.contains(transaction.date))
        .filter(|transaction| matches_search(transaction, users, &needle))
        .cloned()
        .collect();

    matches.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.sort_time().cmp(&a.sort_time()))
    });

    let match_count = matches.len();
    let mut summary = FilterSummary::default();

    for transaction in &matches {
        match transaction.kind {
            TransactionKind::Income => summary.income += transaction.amount,
            TransactionKind::Expense => summary.expense += transaction.amount,
        }
    }
    summary.net = summary.income - summary.expense;

    let mut groups: Vec<DayGroup> = Vec::new();

    for transaction in matches {
        match groups.last_mut() {
            Some(group) if group.date == transaction.date => group.items.push(transaction),
            _ => groups.push(DayGroup {
                date: transaction.date,
                items: vec![transaction],
            }),
        }
    }

    GroupedHistory {
        groups,
        summary,
        match_count,
    }
}

fn matches_search(transaction: &Transaction, users: &[User], needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }

    if transaction.description.to_lowercase().contains(needle) {
        return true;
    }

    find_user(users, transaction.user_id)
        .is_some_and(|user| user.name.to_lowercase().contains(needle))
}


#[cfg(test)]
mod filter_and_group_tests {
    use time::macros::{date, time};

    use crate::models::{Transaction, TransactionKind, User};

    use super::{FilterSpec, Window, filter_and_group};

    fn users() -> Vec<User> {
        vec![User::new(1, "Alice"), User::new(2, "Bob")]
    }

    fn transactions() -> Vec<Transaction> {
        vec![
            Transaction {
                id: 1,
                kind: TransactionKind::Income,
                user_id: 1,
                amount: 1000.0,
                description: "Salary".to_owned(),
                date: date!(2024 - 01 - 05),
                time: Some(time!(09:00)),
                image_url: None,
            },
            Transaction {
                id: 2,
                kind: TransactionKind::Expense,
                user_id: 1,
                amount: 200.0,
                description: "Groceries".to_owned(),
                date: date!(2024 - 01 - 06),
                time: None,
                image_url: None,
            },
            Transaction {
                id: 3,
                kind: TransactionKind::Expense,
                user_id: 2,
                amount: 150.0,
                description: "Petrol".to_owned(),
                date: date!(2024 - 01 - 06),
                time: Some(time!(18:30)),
                image_url: None,
            },
        ]
    }

    #[test]
    fn total_window_returns_everything_grouped_newest_first() {
        let view = filter_and_group(&transactions(), &users(), &FilterSpec::default());

        assert_eq!(view.match_count, 3);
        assert_eq!(view.groups.len(), 2);
        assert_eq!(view.groups[0].date, date!(2024 - 01 - 06));
        assert_eq!(view.groups[1].date, date!(2024 - 01 - 05));
    }

    #[test]
    fn within_a_group_missing_time_sorts_last() {
        let view = filter_and_group(&transactions(), &users(), &FilterSpec::default());

        let day = &view.groups[0];
        assert_eq!(day.items[0].id, 3, "timed transaction should come first");
        assert_eq!(day.items[1].id, 2, "missing time sorts as midnight");
    }

    #[test]
    fn month_window_matches_zero_based_month() {
        let spec = FilterSpec {
            window: Window::Month {
                year: 2024,
                month: 0,
            },
            ..Default::default()
        };

        let view = filter_and_group(&transactions(), &users(), &spec);

        assert_eq!(view.match_count, 3);
        assert_eq!(view.summary.income, 1000.0);
        assert_eq!(view.summary.expense, 350.0);
        assert_eq!(view.summary.net, 650.0);
    }

    #[test]
    fn empty_month_window_gives_zero_summary() {
        let spec = FilterSpec {
            window: Window::Month {
                year: 2024,
                month: 1,
            },
            ..Default::default()
        };

        let view = filter_and_group(&transactions(), &users(), &spec);

        assert_eq!(view.match_count, 0);
        assert!(view.groups.is_empty());
        assert_eq!(view.summary.income, 0.0);
        assert_eq!(view.summary.expense, 0.0);
        assert_eq!(view.summary.net, 0.0);
    }

    #[test]
    fn week_window_buckets_by_day_of_month() {
        let spec = FilterSpec {
            window: Window::Week {
                year: 2024,
                month: 0,
                week: 1,
            },
            ..Default::default()
        };

        let view = filter_and_group(&transactions(), &users(), &spec);

        // Only the 5th falls in days 1-7; the 6th does too, so both days match.
        assert_eq!(view.match_count, 3);

        let spec = FilterSpec {
            window: Window::Week {
                year: 2024,
                month: 0,
                week: 2,
            },
            ..Default::default()
        };

        let view = filter_and_group(&transactions(), &users(), &spec);

        assert_eq!(view.match_count, 0);
    }

    #[test]
    fn year_window_filters_by_calendar_year() {
        let mut all = transactions();
        all.push(Transaction {
            id: 4,
            kind: TransactionKind::Expense,
            user_id: 1,
            amount: 10.0,
            description: "Old".to_owned(),
            date: date!(2023 - 12 - 31),
            time: None,
            image_url: None,
        });

        let spec = FilterSpec {
            window: Window::Year { year: 2023 },
            ..Default::default()
        };

        let view = filter_and_group(&all, &users(), &spec);

        assert_eq!(view.match_count, 1);
        assert_eq!(view.groups[0].items[0].id, 4);
    }

    #[test]
    fn search_matches_description_case_insensitively() {
        let spec = FilterSpec {
            search_text: "groc".to_owned(),
            ..Default::default()
        };

        let view = filter_and_group(&transactions(), &users(), &spec);

        assert_eq!(view.match_count, 1);
        assert_eq!(view.groups[0].items[0].id, 2);
    }

    #[test]
    fn search_matches_owning_user_name() {
        let spec = FilterSpec {
            search_text: "BOB".to_owned(),
            ..Default::default()
        };

        let view = filter_and_group(&transactions(), &users(), &spec);

        assert_eq!(view.match_count, 1);
        assert_eq!(view.groups[0].items[0].id, 3);
    }

    #[test]
    fn orphaned_transactions_match_on_description_only() {
        let mut all = transactions();
        all[2].user_id = 99;

        let spec = FilterSpec {
            search_text: "petrol".to_owned(),
            ..Default::default()
        };

        let view = filter_and_group(&all, &users(), &spec);

        assert_eq!(view.match_count, 1, "orphans must still render, not crash");
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let spec = FilterSpec::default();

        let first = filter_and_group(&transactions(), &users(), &spec);
        let second = filter_and_group(&transactions(), &users(), &spec);

        assert_eq!(first, second);
    }
}
