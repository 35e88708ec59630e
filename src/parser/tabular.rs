//! Parses CSV statements with the columns `Date, Description, Amount, Type`.

use crate::error::ImportError;
use crate::model::{Amount, Transaction, TransactionType};
use chrono::NaiveDate;
use csv::ByteRecord;
use std::borrow::Cow;
use std::io::Read;
use std::str::FromStr;
use tracing::{debug, warn};

/// The canonical date format of a transaction.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// The number of columns a data row must have.
const COLUMNS: usize = 4;

/// Reads a CSV statement from `reader`. The first row is a header and is skipped.
///
/// Every data row produces exactly one `Transaction`, in order. Rows that cannot be parsed become
/// `Status::Error` transactions whose description says what was wrong, so the caller can account
/// for every input row. Bytes that are not valid UTF-8 are replaced rather than failing the batch.
///
/// # Errors
/// - `ImportError::Parse` if the stream is empty (no header row) or cannot be read as CSV.
pub fn parse_csv(reader: impl Read) -> Result<Vec<Transaction>, ImportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    // Byte records so that a statement exported in a legacy encoding still yields every row.
    let mut records = rdr.byte_records();
    match records.next() {
        Some(header) => {
            let header = header.map_err(|e| ImportError::Parse(e.to_string()))?;
            debug!("CSV header: {:?}", decode_fields(&header));
        }
        None => return Err(ImportError::Parse(String::from("csv file is empty"))),
    }

    let mut transactions = Vec::new();
    for record in records {
        let record = record.map_err(|e| ImportError::Parse(e.to_string()))?;
        let fields = decode_fields(&record);
        let fields: Vec<&str> = fields.iter().map(|f| f.as_ref()).collect();
        transactions.push(parse_row(&fields));
    }
    Ok(transactions)
}

/// Invalid UTF-8 sequences are replaced with U+FFFD.
fn decode_fields(record: &ByteRecord) -> Vec<Cow<'_, str>> {
    record.iter().map(String::from_utf8_lossy).collect()
}

/// Parses a `YYYY-MM-DD` date and writes it back zero-padded, so `2023-1-5` becomes
/// `2023-01-05`.
pub(crate) fn parse_date(value: &str) -> Result<String, chrono::ParseError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map(|d| d.format(DATE_FORMAT).to_string())
}

/// Converts one data row, never failing: a bad row becomes an `Error` transaction.
fn parse_row(fields: &[&str]) -> Transaction {
    if fields.len() < COLUMNS {
        warn!("CSV parse error: incomplete row: {fields:?}");
        return Transaction::error("", format!("Incomplete row: {fields:?}"));
    }

    let raw_date = fields[0].trim();
    let date = match parse_date(raw_date) {
        Ok(date) => date,
        Err(e) => {
            warn!("CSV parse error: invalid date format {raw_date:?}: {e}");
            return Transaction::error(raw_date, format!("Invalid date format: {e}"));
        }
    };

    let description = fields[1].trim();

    let amount_str = fields[2].trim();
    let amount = match Amount::from_str(amount_str) {
        Ok(amount) => amount,
        Err(e) => {
            warn!("CSV parse error: invalid amount {amount_str:?}: {e}");
            return Transaction::error(date, format!("Invalid amount {amount_str:?}: {e}"));
        }
    };

    Transaction::new(date, description, amount, TransactionType::new(fields[3]))
}
