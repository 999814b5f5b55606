//! The CSV statement codec.
//!
//! Exports the ledger to the Money Manager tabular format and parses that
//! format back into transaction rows. The importer recognizes exactly one
//! input shape, identified by a column literally named `Income/Expense`; a
//! bad data row is recorded and skipped rather than aborting the batch.
//!
//! Import is not idempotent by design: re-importing the same file creates
//! duplicate transactions. Do not add deduplication here.

use time::{Date, Month, Time};

use crate::{
    Error,
    models::{Transaction, TransactionKind, User, UserId, user_display_name},
};

/// The column layouts [export_csv] can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsvExportFormat {
    /// The five core columns plus the kind column.
    #[default]
    Minimal,
    /// The minimal columns plus the duplicated
    /// `Description`/`Amount`/`Currency`/`Account` columns some spreadsheet
    /// tools expect. The importer ignores the extras.
    Extended,
}

const MINIMAL_HEADER: [&str; 6] = ["Date", "Account", "Category", "Note", "INR", "Income/Expense"];
const EXTENDED_HEADER: [&str; 11] = [
    "Date",
    "Account",
    "Category",
    "Subcategory",
    "Note",
    "INR",
    "Income/Expense",
    "Description",
    "Amount",
    "Currency",
    "Account",
];

/// Serialize transactions to CSV text.
///
/// If `filter_user` is given, only that user's transactions are included; no
/// other filtering is applied and the input order is kept. The `Date` column
/// is `MM/DD/YYYY HH:MM:SS` with the time defaulting to `00:00:00`, the
/// `Account` column is the owning user's name (`N/A` when the owner no
/// longer exists), and amounts are written as bare numbers.
///
/// # Errors
/// Returns [Error::EmptyExport] when the filtered set is empty, so callers
/// can tell the user instead of silently producing an empty file.
pub fn export_csv(
    transactions: &[Transaction],
    users: &[User],
    filter_user: Option<UserId>,
    format: CsvExportFormat,
) -> Result<String, Error> {
    let included: Vec<&Transaction> = transactions
        .iter()
        .filter(|transaction| filter_user.is_none_or(|id| transaction.user_id == id))
        .collect();

    if included.is_empty() {
        return Err(Error::EmptyExport);
    }

    let mut writer = csv::Writer::from_writer(Vec::new());

    match format {
        CsvExportFormat::Minimal => writer.write_record(MINIMAL_HEADER)?,
        CsvExportFormat::Extended => writer.write_record(EXTENDED_HEADER)?,
    }

    for transaction in included {
        let date = format_mdy_datetime(transaction.date, transaction.time);
        let account = user_display_name(users, transaction.user_id);
        let amount = transaction.amount.to_string();
        let kind = transaction.kind.label();

        match format {
            CsvExportFormat::Minimal => writer.write_record([
                date.as_str(),
                account,
                "Other",
                &transaction.description,
                &amount,
                kind,
            ])?,
            CsvExportFormat::Extended => writer.write_record([
                date.as_str(),
                account,
                "Other",
                "",
                &transaction.description,
                &amount,
                kind,
                &transaction.description,
                &amount,
                "INR",
                account,
            ])?,
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| Error::Io(error.to_string()))?;

    String::from_utf8(bytes).map_err(|error| Error::Io(error.to_string()))
}

/// The conventional file name for a CSV export:
/// `expense_data[_<username>]_<ISO-date>.csv`.
pub fn csv_export_filename(user_name: Option<&str>, date: Date) -> String {
    match user_name {
        Some(name) => format!("expense_data_{}_{date}.csv", name.replace(' ', "_")),
        None => format!("expense_data_{date}.csv"),
    }
}

/// One successfully parsed import row, not yet reconciled to a user.
///
/// The `account` name is matched (case-insensitively) or synthesized into a
/// [User] by the ledger, which also assigns the transaction its ID.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    /// The `Account` column: the name of the user the row belongs to.
    pub account: String,
    /// The parsed `Income/Expense` column.
    pub kind: TransactionKind,
    /// The parsed `INR` column.
    pub amount: f64,
    /// The `Note` column.
    pub description: String,
    /// The date part of the `Date` column.
    pub date: Date,
    /// The time part of the `Date` column. `00:00:00` imports as "no
    /// specific time".
    pub time: Option<Time>,
}

/// A data row that could not be parsed, with its 1-based line number.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRowError {
    /// The 1-based line the row appeared on (the header is line 1).
    pub line: usize,
    /// What went wrong with the row.
    pub message: String,
}

/// The outcome of parsing a CSV document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CsvImport {
    /// The successfully parsed rows, in file order.
    pub rows: Vec<CsvRow>,
    /// The rows that failed to parse and were skipped.
    pub errors: Vec<CsvRowError>,
}

/// Parse CSV text in the Money Manager format into transaction rows.
///
/// The header must contain the `Date`, `Account`, `Note`, `INR` and
/// `Income/Expense` columns; extra columns are ignored. Row-level failures
/// (malformed date, non-numeric or non-positive amount, unknown kind, empty
/// note or account) are collected in [CsvImport::errors] and do not abort
/// the batch.
///
/// # Errors
/// Returns [Error::UnrecognizedCsvFormat] when the header does not match,
/// in which case zero rows are imported.
pub fn parse_csv_rows(text: &str) -> Result<CsvImport, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| Error::UnrecognizedCsvFormat(error.to_string()))?
        .clone();

    if !headers.iter().any(|column| column == "Income/Expense") {
        return Err(Error::UnrecognizedCsvFormat(
            "the header row does not contain an 'Income/Expense' column".to_owned(),
        ));
    }

    let columns = ImportColumns::locate(&headers)?;
    let mut import = CsvImport::default();

    for (index, record) in reader.records().enumerate() {
        // Line 1 is the header row.
        let line = index + 2;

        let record = match record {
            Ok(record) => record,
            Err(error) => {
                import.errors.push(CsvRowError {
                    line,
                    message: error.to_string(),
                });
                continue;
            }
        };

        match columns.parse_row(&record) {
            Ok(row) => import.rows.push(row),
            Err(message) => import.errors.push(CsvRowError { line, message }),
        }
    }

    Ok(import)
}

/// The positions of the five core columns within the header row.
struct ImportColumns {
    date: usize,
    account: usize,
    note: usize,
    amount: usize,
    kind: usize,
}

impl ImportColumns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, Error> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|column| column == name)
                .ok_or_else(|| {
                    Error::UnrecognizedCsvFormat(format!(
                        "the header row is missing the '{name}' column"
                    ))
                })
        };

        Ok(Self {
            date: find("Date")?,
            account: find("Account")?,
            note: find("Note")?,
            amount: find("INR")?,
            kind: find("Income/Expense")?,
        })
    }

    fn parse_row(&self, record: &csv::StringRecord) -> Result<CsvRow, String> {
        let field = |index: usize, name: &str| {
            record
                .get(index)
                .ok_or_else(|| format!("the row is missing the '{name}' column"))
        };

        let (date, time) = parse_mdy_datetime(field(self.date, "Date")?)?;

        let account = field(self.account, "Account")?.trim();
        if account.is_empty() {
            return Err("the 'Account' column is empty".to_owned());
        }

        let description = field(self.note, "Note")?.trim();
        if description.is_empty() {
            return Err("the 'Note' column is empty".to_owned());
        }

        let amount_text = field(self.amount, "INR")?;
        let amount: f64 = amount_text
            .parse()
            .map_err(|_| format!("could not parse '{amount_text}' as an amount"))?;
        if !(amount > 0.0) {
            return Err(format!("amounts must be positive, got {amount}"));
        }

        let kind_text = field(self.kind, "Income/Expense")?;
        let kind = TransactionKind::parse(kind_text)
            .ok_or_else(|| format!("unknown transaction kind '{kind_text}'"))?;

        Ok(CsvRow {
            account: account.to_owned(),
            kind,
            amount,
            description: description.to_owned(),
            date,
            time,
        })
    }
}

fn format_mdy_datetime(date: Date, time: Option<Time>) -> String {
    let time = time.unwrap_or(Time::MIDNIGHT);

    format!(
        "{:02}/{:02}/{:04} {:02}:{:02}:{:02}",
        date.month() as u8,
        date.day(),
        date.year(),
        time.hour(),
        time.minute(),
        time.second()
    )
}

/// Parse a `MM/DD/YYYY[ HH:MM[:SS]]` string into a date and optional time.
///
/// A time of exactly midnight imports as `None`: the export writes
/// `00:00:00` for transactions that had no recorded time, and "no specific
/// time" is the more faithful reading of that value.
fn parse_mdy_datetime(text: &str) -> Result<(Date, Option<Time>), String> {
    let (date_part, time_part) = match text.split_once(' ') {
        Some((date_part, time_part)) => (date_part, Some(time_part)),
        None => (text, None),
    };

    let mut parts = date_part.split('/');
    let (month, day, year) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(month), Some(day), Some(year), None) => (month, day, year),
        _ => return Err(format!("could not parse '{date_part}' as MM/DD/YYYY")),
    };

    let error = |_| format!("could not parse '{date_part}' as MM/DD/YYYY");
    let month: u8 = month.parse().map_err(error)?;
    let day: u8 = day.parse().map_err(error)?;
    let year: i32 = year.parse().map_err(error)?;

    let month =
        Month::try_from(month).map_err(|_| format!("'{date_part}' has an invalid month"))?;
    let date = Date::from_calendar_date(year, month, day)
        .map_err(|_| format!("'{date_part}' is not a valid calendar date"))?;

    let time = match time_part {
        None | Some("") => None,
        Some(time_text) => parse_clock_time(time_text)?,
    };

    Ok((date, time))
}

fn parse_clock_time(text: &str) -> Result<Option<Time>, String> {
    let mut parts = text.split(':');
    let (hour, minute) = match (parts.next(), parts.next()) {
        (Some(hour), Some(minute)) => (hour, minute),
        _ => return Err(format!("could not parse '{text}' as HH:MM[:SS]")),
    };

    let error = |_| format!("could not parse '{text}' as HH:MM[:SS]");
    let hour: u8 = hour.parse().map_err(error)?;
    let minute: u8 = minute.parse().map_err(error)?;

    // Seconds are accepted but dropped: the data model records HH:MM.
    let time =
        Time::from_hms(hour, minute, 0).map_err(|_| format!("'{text}' is not a valid time"))?;

    Ok(if time == Time::MIDNIGHT { None } else { Some(time) })
}

#[cfg(test)]
mod export_csv_tests {
    use time::macros::{date, time};

    use crate::models::{Transaction, TransactionKind, User};

    use super::{CsvExportFormat, Error, csv_export_filename, export_csv};

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
                time: Some(time!(09:30)),
                image_url: None,
            },
            Transaction {
                id: 2,
                kind: TransactionKind::Expense,
                user_id: 2,
                amount: 12.5,
                description: "Milk, \"full\" cream".to_owned(),
                date: date!(2024 - 01 - 06),
                time: None,
                image_url: None,
            },
        ]
    }

    #[test]
    fn writes_minimal_header_and_formatted_rows() {
        let text = export_csv(
            &transactions(),
            &users(),
            None,
            CsvExportFormat::Minimal,
        )
        .unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Date,Account,Category,Note,INR,Income/Expense")
        );
        assert_eq!(
            lines.next(),
            Some("01/05/2024 09:30:00,Alice,Other,Salary,1000,Income")
        );
        assert_eq!(
            lines.next(),
            Some("01/06/2024 00:00:00,Bob,Other,\"Milk, \"\"full\"\" cream\",12.5,Expense")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn extended_header_duplicates_columns() {
        let text = export_csv(
            &transactions(),
            &users(),
            None,
            CsvExportFormat::Extended,
        )
        .unwrap();

        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "Date,Account,Category,Subcategory,Note,INR,Income/Expense,\
             Description,Amount,Currency,Account"
        );
    }

    #[test]
    fn filters_to_a_single_user() {
        let text = export_csv(
            &transactions(),
            &users(),
            Some(2),
            CsvExportFormat::Minimal,
        )
        .unwrap();

        assert_eq!(text.lines().count(), 2, "header plus Bob's one transaction");
        assert!(text.contains("Bob"));
        assert!(!text.contains("Alice"));
    }

    #[test]
    fn empty_export_is_an_error() {
        let result = export_csv(&[], &users(), None, CsvExportFormat::Minimal);

        assert_eq!(result, Err(Error::EmptyExport));

        let result = export_csv(
            &transactions(),
            &users(),
            Some(99),
            CsvExportFormat::Minimal,
        );

        assert_eq!(result, Err(Error::EmptyExport));
    }

    #[test]
    fn orphaned_transactions_export_with_placeholder_account() {
        let mut orphaned = transactions();
        orphaned[0].user_id = 99;

        let text = export_csv(&orphaned, &users(), None, CsvExportFormat::Minimal).unwrap();

        assert!(text.lines().nth(1).unwrap().contains("N/A"));
    }

    #[test]
    fn filename_follows_convention() {
        assert_eq!(
            csv_export_filename(None, date!(2024 - 03 - 09)),
            "expense_data_2024-03-09.csv"
        );
        assert_eq!(
            csv_export_filename(Some("Alice Jones"), date!(2024 - 03 - 09)),
            "expense_data_Alice_Jones_2024-03-09.csv"
        );
    }
}
