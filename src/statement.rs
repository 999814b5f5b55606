//! The statement export: a human-readable Word document with a summary and
//! transaction detail table.
//!
//! This is a read-only export; there is no corresponding importer.

use docx_rs::{AlignmentType, Docx, Paragraph, Run, Table, TableCell, TableRow};
use time::{Date, Month, OffsetDateTime};

use crate::{
    Error,
    models::{
        Transaction, TransactionKind, User, UserId, find_user, format_time_12h, user_display_name,
    },
    money::format_inr,
};

/// Render a transaction statement as `.docx` bytes.
///
/// If `filter_user` is given only that user's transactions are included and
/// the statement is titled with their name; otherwise it covers all users.
/// The detail table is sorted newest first. `generated_at` stamps the
/// statement; it is supplied by the caller so the renderer itself never
/// reads the wall clock.
///
/// # Errors
/// Returns [Error::EmptyExport] when the filtered set is empty and
/// [Error::StatementError] when the document cannot be packed.
pub fn export_statement(
    transactions: &[Transaction],
    users: &[User],
    filter_user: Option<UserId>,
    generated_at: OffsetDateTime,
) -> Result<Vec<u8>, Error> {
    let mut included: Vec<&Transaction> = transactions
        .iter()
        .filter(|transaction| filter_user.is_none_or(|id| transaction.user_id == id))
        .collect();

    if included.is_empty() {
        return Err(Error::EmptyExport);
    }

    included.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.sort_time().cmp(&a.sort_time()))
    });

    let account_holder = match filter_user {
        Some(id) => find_user(users, id).map_or("N/A", |user| user.name.as_str()),
        None => "All Users",
    };

    let (total_income, total_expense) = totals(&included);
    let net_balance = total_income - total_expense;

    let mut docx = Docx::new()
        .add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text("Transaction Statement").bold().size(40))
                .align(AlignmentType::Center),
        )
        .add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(format!("Account Holder: {account_holder}"))),
        )
        .add_paragraph(Paragraph::new().add_run(Run::new().add_text(format!(
            "Statement Date: {}",
            format_date_long(generated_at.date())
        ))))
        .add_paragraph(
            Paragraph::new().add_run(Run::new().add_text("Account Summary").bold().size(32)),
        )
        .add_table(Table::new(vec![
            summary_row("Total Income", total_income),
            summary_row("Total Expenses", total_expense),
            summary_row("Net Balance", net_balance),
        ]))
        .add_paragraph(
            Paragraph::new().add_run(Run::new().add_text("Transaction Details").bold().size(32)),
        );

    let mut detail_rows = vec![TableRow::new(vec![
        header_cell("Date"),
        header_cell("Account"),
        header_cell("Description"),
        header_cell("Type"),
        header_cell("Amount (₹)"),
    ])];

    for transaction in &included {
        detail_rows.push(detail_row(transaction, users));
    }

    docx = docx.add_table(Table::new(detail_rows)).add_paragraph(
        Paragraph::new()
            .add_run(
                Run::new()
                    .add_text(format!(
                        "Generated on {} at {}",
                        format_date_long(generated_at.date()),
                        format_time_12h(generated_at.time())
                    ))
                    .italic(),
            )
            .align(AlignmentType::Center),
    );

    let mut buffer = std::io::Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|error| Error::StatementError(error.to_string()))?;

    Ok(buffer.into_inner())
}

/// The conventional file name for a statement export:
/// `transaction_statement[_<username>]_<ISO-date>.docx`.
pub fn statement_filename(user_name: Option<&str>, date: Date) -> String {
    match user_name {
        Some(name) => format!("transaction_statement_{}_{date}.docx", name.replace(' ', "_")),
        None => format!("transaction_statement_{date}.docx"),
    }
}

fn totals(transactions: &[&Transaction]) -> (f64, f64) {
    let mut income = 0.0;
    let mut expense = 0.0;

    for transaction in transactions {
        match transaction.kind {
            TransactionKind::Income => income += transaction.amount,
            TransactionKind::Expense => expense += transaction.amount,
        }
    }

    (income, expense)
}

fn summary_row(label: &str, amount: f64) -> TableRow {
    TableRow::new(vec![
        TableCell::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text(label).bold())),
        TableCell::new().add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(format_inr(amount)))
                .align(AlignmentType::Right),
        ),
    ])
}

fn header_cell(label: &str) -> TableCell {
    TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(label).bold()))
}

fn detail_row(transaction: &Transaction, users: &[User]) -> TableRow {
    let date = format!(
        "{:02}/{:02}/{:04}",
        transaction.date.month() as u8,
        transaction.date.day(),
        transaction.date.year()
    );
    let kind_color = match transaction.kind {
        TransactionKind::Income => "2E7D32",
        TransactionKind::Expense => "C62828",
    };
    // The column is already labelled with the currency symbol.
    let amount = format_inr(transaction.amount).replace('₹', "");

    TableRow::new(vec![
        TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(date))),
        TableCell::new().add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(user_display_name(users, transaction.user_id))),
        ),
        TableCell::new().add_paragraph(
            Paragraph::new().add_run(Run::new().add_text(transaction.description.as_str())),
        ),
        TableCell::new().add_paragraph(
            Paragraph::new().add_run(
                Run::new()
                    .add_text(transaction.kind.label())
                    .color(kind_color),
            ),
        ),
        TableCell::new().add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(amount))
                .align(AlignmentType::Right),
        ),
    ])
}

fn format_date_long(date: Date) -> String {
    format!(
        "{} {}, {}",
        month_name(date.month()),
        date.day(),
        date.year()
    )
}

fn month_name(month: Month) -> &'static str {
    match month {
        Month::January => "January",
        Month::February => "February",
        Month::March => "March",
        Month::April => "April",
        Month::May => "May",
        Month::June => "June",
        Month::July => "July",
        Month::August => "August",
        Month::September => "September",
        Month::October => "October",
        Month::November => "November",
        Month::December => "December",
    }
}
