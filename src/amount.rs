//! Parsing and storage of amounts of money.
//!
//! Amounts are [Decimal]s so that the cached balance of a child can be compared
//! exactly against the sum of their ledger. SQLite has no decimal type, so
//! amounts are stored as TEXT and converted on the way in and out.

use std::str::FromStr;

use rusqlite::{Row, types::Type};
use rust_decimal::Decimal;

use crate::Error;

/// Parse an amount of money entered by a user, e.g. "12.50".
///
/// A leading dollar sign and surrounding whitespace are ignored.
///
/// # Errors
/// Returns [Error::InvalidAmount] if `raw_amount` is not a number.
pub fn parse_amount(raw_amount: &str) -> Result<Decimal, Error> {
    let trimmed = raw_amount.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed);

    Decimal::from_str(trimmed)
        .map(|amount| amount.normalize())
        .map_err(|_| Error::InvalidAmount(format!("\"{raw_amount}\" is not a number")))
}

/// Read the TEXT column at `index` as a [Decimal].
pub(crate) fn get_decimal(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let raw: String = row.get(index)?;

    Decimal::from_str(&raw).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}

/// Format `amount` for storing in a TEXT column.
pub(crate) fn to_sql_text(amount: Decimal) -> String {
    amount.normalize().to_string()
}
