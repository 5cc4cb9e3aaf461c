use time::macros::format_description;

use super::client::{Report, Transaction};
use crate::cart;

const TRANSACTION_HEADER: [&str; 7] = [
    "Transaction ID",
    "Order ID",
    "Amount",
    "Status",
    "Customer Email",
    "Date",
    "Pickup Code",
];

pub fn filename(report: &Report) -> String {
    format!("square-sales-report-{}.csv", report.report_date)
}

fn transaction_time(tx: &Transaction) -> String {
    let format = format_description!(
        "[month padding:none]/[day padding:none]/[year] [hour repr:12 padding:none]:[minute] [period]"
    );
    tx.created_at.format(&format).unwrap_or_default()
}

// The csv writer cannot emit a truly blank line (an empty record comes out
// as a lone `""` field), so each section is written separately and the
// sections are joined with bare newlines.
fn section<F>(write: F) -> Vec<u8>
where
    F: FnOnce(&mut csv::Writer<Vec<u8>>),
{
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    write(&mut writer);
    writer.into_inner().unwrap()
}

/// Render a report as CSV. Pure and deterministic: the same report always
/// yields byte-identical output. Field values containing delimiters or
/// quotes are quoted per RFC 4180 rather than corrupting the column count.
pub fn to_csv(report: &Report) -> Vec<u8> {
    // Section layout is fixed: title, summary block, transaction table,
    // separated by blank lines.
    let title = section(|w| {
        w.write_record(["Square Sales Report", &report.report_date])
            .unwrap();
    });

    let summary = section(|w| {
        w.write_record(["Summary"]).unwrap();
        w.write_record(["Total Sales", &cart::fmt_usd(report.total_amount)])
            .unwrap();
        w.write_record(["Total Transactions", &report.total_transactions.to_string()])
            .unwrap();
        w.write_record([
            "Average Transaction",
            &cart::fmt_usd(report.average_transaction),
        ])
        .unwrap();
        w.write_record([
            "Successful Payments",
            &report.successful_payments.to_string(),
        ])
        .unwrap();
        w.write_record(["Failed Payments", &report.failed_payments.to_string()])
            .unwrap();
    });

    let details = section(|w| {
        w.write_record(["Transaction Details"]).unwrap();
        w.write_record(TRANSACTION_HEADER).unwrap();
        for tx in &report.transactions {
            w.write_record([
                tx.transaction_id.as_str(),
                tx.order_id.as_str(),
                &cart::fmt_usd(tx.amount),
                tx.status.as_str(),
                tx.user_email.as_str(),
                &transaction_time(tx),
                tx.pickup_code.as_deref().unwrap_or("N/A"),
            ])
            .unwrap();
        }
    });

    [title, summary, details].join(&b"\n"[..])
}
