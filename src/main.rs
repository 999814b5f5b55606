//! The splitledger command line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use time::{Date, OffsetDateTime, Time, macros::format_description};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use splitledger::{
    CsvExportFormat, Error, FilterSpec, Ledger, TransactionData, TransactionKind, UserId, Window,
    csv_export_filename, find_user, format_inr, format_time_12h, statement_filename,
    stores::{JsonFileStore, LedgerStore, SqliteStore},
    user_display_name, week_of_month,
};

/// A ledger for shared and personal expenses.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Which storage backend holds the ledger.
    #[arg(long, value_enum, default_value_t = Backend::Json)]
    backend: Backend,

    /// File path to the ledger (a JSON file or a SQLite database).
    #[arg(long, default_value = "ledger.json")]
    db_path: PathBuf,

    /// The account tag that scopes the SQLite backend.
    #[arg(long, default_value = "main")]
    account: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Backend {
    /// A single JSON document rewritten on every change.
    Json,
    /// A SQLite database, shareable between accounts.
    Sqlite,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List users and their balances.
    Users,
    /// Add a user.
    AddUser {
        /// The user's display name.
        name: String,
    },
    /// Rename a user.
    RenameUser {
        /// The user's ID, as shown by `users`.
        id: UserId,
        /// The new display name.
        name: String,
    },
    /// Delete a user and all of their transactions.
    DeleteUser {
        /// The user's ID, as shown by `users`.
        id: UserId,
    },
    /// Record a transaction.
    Add(TransactionArgs),
    /// Replace every field of a transaction.
    Edit {
        /// The transaction's ID, as shown by `history`.
        id: i64,
        #[command(flatten)]
        data: TransactionArgs,
    },
    /// Delete a transaction.
    Delete {
        /// The transaction's ID, as shown by `history`.
        id: i64,
    },
    /// Show the total balance and any integrity warnings.
    Balances,
    /// Show the transaction history, filtered and grouped by day.
    History {
        /// Only show transactions in this calendar year.
        #[arg(long)]
        year: Option<i32>,
        /// Only show transactions in this month (1-12; requires --year).
        #[arg(long, requires = "year")]
        month: Option<u8>,
        /// Only show transactions in this week of the month (1-5; requires
        /// --month). Weeks are the simple day 1-7, 8-14, ... buckets.
        #[arg(long, requires = "month")]
        week: Option<u8>,
        /// Only show transactions whose description or owner matches.
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Import transactions from a CSV file.
    Import {
        /// The CSV file to import.
        file: PathBuf,
    },
    /// Export transactions to a CSV file.
    ExportCsv {
        /// Only export this user's transactions.
        #[arg(long)]
        user: Option<UserId>,
        /// Write the extended column layout instead of the minimal one.
        #[arg(long)]
        extended: bool,
        /// Where to write the file. Defaults to a dated file name.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Export a Word-document transaction statement.
    ExportStatement {
        /// Only include this user's transactions.
        #[arg(long)]
        user: Option<UserId>,
        /// Where to write the file. Defaults to a dated file name.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct TransactionArgs {
    /// The ID of the user the transaction belongs to.
    #[arg(long)]
    user: UserId,

    /// Whether money was earned or spent.
    #[arg(long, value_enum)]
    kind: KindArg,

    /// How much money moved. Must be positive.
    #[arg(long)]
    amount: f64,

    /// What the transaction was for.
    #[arg(long)]
    description: String,

    /// The date of the transaction as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    date: Option<String>,

    /// The time of day as HH:MM, if one should be recorded.
    #[arg(long)]
    time: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Income,
    Expense,
}

impl From<KindArg> for TransactionKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Income => TransactionKind::Income,
            KindArg::Expense => TransactionKind::Expense,
        }
    }
}

impl TransactionArgs {
    fn into_data(self) -> Result<TransactionData, Error> {
        let date = match self.date {
            Some(text) => parse_date(&text)?,
            None => now().date(),
        };
        let time = self.time.as_deref().map(parse_time).transpose()?;

        Ok(TransactionData {
            kind: self.kind.into(),
            user_id: self.user,
            amount: self.amount,
            description: self.description,
            date,
            time,
            image_url: None,
        })
    }
}

fn parse_date(text: &str) -> Result<Date, Error> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map_err(|_| Error::InvalidDate(text.to_owned()))
}

fn parse_time(text: &str) -> Result<Time, Error> {
    Time::parse(text, format_description!("[hour]:[minute]"))
        .map_err(|_| Error::InvalidTime(text.to_owned()))
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn main() {
    setup_logging();

    let cli = Cli::parse();

    let result = match cli.backend {
        Backend::Json => {
            JsonFileStore::open(&cli.db_path).and_then(|store| run(store, cli.command))
        }
        Backend::Sqlite => {
            SqliteStore::open(&cli.db_path, &cli.account).and_then(|store| run(store, cli.command))
        }
    };

    if let Err(error) = result {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn setup_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
}

fn run<S: LedgerStore>(store: S, command: Command) -> Result<(), Error> {
    let mut ledger = Ledger::load(store)?;

    match command {
        Command::Users => {
            if ledger.users().is_empty() {
                println!("No users yet.");
            }
            for user in ledger.users() {
                println!("{:>4}  {}  {}", user.id, user.name, format_inr(user.balance));
            }
        }
        Command::AddUser { name } => {
            let user = ledger.add_user(&name)?;
            println!("Added user {} with ID {}.", user.name, user.id);
        }
        Command::RenameUser { id, name } => {
            let user = ledger.rename_user(id, &name)?;
            println!("Renamed user {} to {}.", user.id, user.name);
        }
        Command::DeleteUser { id } => {
            ledger.delete_user(id)?;
            println!("Deleted user {id} and their transactions.");
        }
        Command::Add(args) => {
            let transaction = ledger.add_transaction(args.into_data()?)?;
            println!(
                "Recorded {} of {} with ID {}.",
                transaction.kind.label().to_lowercase(),
                format_inr(transaction.amount),
                transaction.id
            );
        }
        Command::Edit { id, data } => {
            let transaction = ledger.update_transaction(id, data.into_data()?)?;
            println!("Updated transaction {}.", transaction.id);
        }
        Command::Delete { id } => {
            ledger.delete_transaction(id)?;
            println!("Deleted transaction {id}.");
        }
        Command::Balances => {
            for user in ledger.users() {
                println!("{}: {}", user.name, format_inr(user.balance));
            }
            println!("Total: {}", format_inr(ledger.total_balance()));
            for id in ledger.integrity_warnings() {
                println!("warning: transaction {id} belongs to a user that no longer exists");
            }
        }
        Command::History {
            year,
            month,
            week,
            search,
        } => {
            let window = build_window(year, month, week)?;
            let history = ledger.history(&FilterSpec {
                window,
                search_text: search,
            });

            for group in &history.groups {
                println!("{}", group.date);
                for transaction in &group.items {
                    let time = transaction
                        .time
                        .map(format_time_12h)
                        .unwrap_or_default();
                    println!(
                        "  [{:>4}] {:>8}  {}  {} ({})",
                        transaction.id,
                        time,
                        format_inr(transaction.signed_amount()),
                        transaction.description,
                        user_display_name(ledger.users(), transaction.user_id),
                    );
                }
            }
            println!(
                "{} transactions. Income {}, expenses {}, net {}.",
                history.match_count,
                format_inr(history.summary.income),
                format_inr(history.summary.expense),
                format_inr(history.summary.net)
            );
        }
        Command::Import { file } => {
            let text = std::fs::read_to_string(&file)?;
            let outcome = ledger.import_csv(&text)?;

            println!("Imported {} transactions.", outcome.imported_count);
            for user in &outcome.new_users {
                println!("Added user {} for account '{}'.", user.id, user.name);
            }
            for error in &outcome.errors {
                println!("line {}: {}", error.line, error.message);
            }
        }
        Command::ExportCsv {
            user,
            extended,
            output,
        } => {
            let format = if extended {
                CsvExportFormat::Extended
            } else {
                CsvExportFormat::Minimal
            };
            let text = ledger.export_csv(user, format)?;
            let path = output.unwrap_or_else(|| {
                csv_export_filename(user_name(&ledger, user), now().date()).into()
            });

            std::fs::write(&path, text)?;
            println!("Wrote {}.", path.display());
        }
        Command::ExportStatement { user, output } => {
            let generated_at = now();
            let bytes = ledger.export_statement(user, generated_at)?;
            let path = output.unwrap_or_else(|| {
                statement_filename(user_name(&ledger, user), generated_at.date()).into()
            });

            std::fs::write(&path, bytes)?;
            println!("Wrote {}.", path.display());
        }
    }

    Ok(())
}

/// Map the CLI's one-based month to the zero-based month the filter uses.
fn build_window(year: Option<i32>, month: Option<u8>, week: Option<u8>) -> Result<Window, Error> {
    let window = match (year, month, week) {
        (None, None, None) => Window::Total,
        (Some(year), None, None) => Window::Year { year },
        (Some(year), Some(month), None) => Window::Month {
            year,
            month: month_index(month)?,
        },
        (Some(year), Some(month), Some(week)) => {
            if !(1..=week_of_month(31)).contains(&week) {
                return Err(Error::InvalidDate(format!("week {week} is out of range")));
            }

            Window::Week {
                year,
                month: month_index(month)?,
                week,
            }
        }
        // clap's `requires` rules make the remaining shapes unreachable.
        _ => Window::Total,
    };

    Ok(window)
}

fn month_index(month: u8) -> Result<u8, Error> {
    if (1..=12).contains(&month) {
        Ok(month - 1)
    } else {
        Err(Error::InvalidDate(format!("month {month} is out of range")))
    }
}

fn user_name<S: LedgerStore>(ledger: &Ledger<S>, id: Option<UserId>) -> Option<&str> {
    id.and_then(|id| find_user(ledger.users(), id).map(|user| user.name.as_str()))
}
