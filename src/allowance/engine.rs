//! Pays monthly allowances into the ledger and records extra earnings.
//!
//! Allowances are not paid by a background job. Instead, every time a
//! child's allowance is read or changed the missed payments up to today are
//! appended to the ledger. Each operation runs in a transaction started with
//! `BEGIN IMMEDIATE`, so the ledger tail cannot change between reading it and
//! writing the new entries.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use rust_decimal::Decimal;
use time::Date;

use crate::{
    Error,
    allowance::schedule::{MAX_OCCURRENCES, Occurrences},
    auth::UserID,
    child::{AllowanceSettings, Child, get_child, increment_balance, set_allowance_settings},
    ledger::{
        EntryKind, LedgerEntry, NewLedgerEntry, get_last_allowance_date, get_ledger_entries,
        insert_ledger_entry,
    },
};

/// The description stored for extra earnings entered without one.
pub const DEFAULT_EARNINGS_DESCRIPTION: &str = "Extra earnings";

/// The result of paying a child's missed allowance.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// The allowance entries that were added to the ledger, oldest first.
    pub entries: Vec<LedgerEntry>,
    /// The child's balance after the entries were added.
    pub balance: Decimal,
}

/// Store new allowance settings for a child and pay any allowance that is
/// due up to and including `today`.
///
/// Entries already in the ledger keep the amount they were paid with.
///
/// # Errors
/// Returns:
/// - [Error::NotFound] if there is no child with `child_id`.
/// - [Error::AllowanceRangeTooLong] if the start date would create more than
///   [MAX_OCCURRENCES] payments.
/// - [Error::InvalidAmount] if the payments would overflow the balance.
/// - [Error::SqlError] if the database could not be updated.
///
/// Nothing is written if an error is returned.
pub fn update_allowance(
    child_id: UserID,
    settings: AllowanceSettings,
    today: Date,
    connection: &Connection,
) -> Result<Reconciliation, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    set_allowance_settings(child_id, &settings, &transaction)?;
    let child = get_child(child_id, &transaction)?;
    let reconciliation = pay_missed_allowance(&child, today, &transaction)?;

    transaction.commit()?;

    tracing::info!(
        "Updated allowance for child {child_id} to {} on day {} from {:?}",
        settings.monthly_allowance,
        settings.allowance_day.get(),
        settings.start_date
    );

    Ok(reconciliation)
}

/// Pay any allowance the child is owed up to and including `today`.
///
/// Calling this again with the same `today` does not change anything.
///
/// # Errors
/// Returns:
/// - [Error::NotFound] if there is no child with `child_id`.
/// - [Error::AllowanceRangeTooLong] if more than [MAX_OCCURRENCES] payments are due.
/// - [Error::InvalidAmount] if the payments would overflow the balance.
/// - [Error::SqlError] if the database could not be updated.
pub fn reconcile_allowance(
    child_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<Reconciliation, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let child = get_child(child_id, &transaction)?;
    let reconciliation = pay_missed_allowance(&child, today, &transaction)?;

    transaction.commit()?;

    Ok(reconciliation)
}

/// Record extra earnings for a child and add them to their balance.
///
/// A blank `description` is stored as [DEFAULT_EARNINGS_DESCRIPTION].
///
/// # Errors
/// Returns:
/// - [Error::InvalidAmount] if `amount` is zero or negative, or if adding it
///   would overflow the balance.
/// - [Error::NotFound] if there is no child with `child_id`.
/// - [Error::SqlError] if the database could not be updated.
///
/// Nothing is written if an error is returned.
pub fn add_earnings(
    child_id: UserID,
    amount: Decimal,
    description: &str,
    today: Date,
    connection: &Connection,
) -> Result<LedgerEntry, Error> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(format!(
            "earnings must be greater than zero, got {amount}"
        )));
    }

    let description = match description.trim() {
        "" => DEFAULT_EARNINGS_DESCRIPTION,
        description => description,
    };

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let child = get_child(child_id, &transaction)?;
    let entry = insert_ledger_entry(
        NewLedgerEntry {
            child_id: child.id,
            amount,
            description: description.to_owned(),
            kind: EntryKind::Extra,
            date: today,
        },
        &transaction,
    )?;
    let balance = increment_balance(child.id, amount, &transaction)?;

    transaction.commit()?;

    tracing::info!("Added {amount} of extra earnings for child {child_id}, balance is now {balance}");

    Ok(entry)
}

/// Every ledger entry for the child, newest first.
///
/// This does not pay missed allowance, call [reconcile_allowance] first for an
/// up to date history.
///
/// # Errors
/// Returns [Error::NotFound] if there is no child with `child_id`.
pub fn get_earnings_history(
    child_id: UserID,
    connection: &Connection,
) -> Result<Vec<LedgerEntry>, Error> {
    let child = get_child(child_id, connection)?;

    get_ledger_entries(child.id, connection)
}

/// Append the allowance payments due since the later of the start date and
/// the last payment.
///
/// Must be called inside a transaction.
fn pay_missed_allowance(
    child: &Child,
    today: Date,
    connection: &Connection,
) -> Result<Reconciliation, Error> {
    let Some(start_date) = child.allowance_start_date else {
        tracing::debug!("Child {} has no allowance start date, skipping", child.id);
        return Ok(Reconciliation {
            entries: Vec::new(),
            balance: child.balance,
        });
    };

    let last_payment = get_last_allowance_date(child.id, connection)?;
    let occurrences = Occurrences::resume(start_date, last_payment, child.allowance_day, today);

    let due_dates: Vec<Date> = occurrences.take(MAX_OCCURRENCES + 1).collect();
    if due_dates.len() > MAX_OCCURRENCES {
        tracing::warn!(
            "Refusing to pay more than {MAX_OCCURRENCES} allowances for child {} from {start_date}",
            child.id
        );
        return Err(Error::AllowanceRangeTooLong(start_date));
    }

    if due_dates.is_empty() {
        tracing::debug!("No allowance due for child {} as of {today}", child.id);
        return Ok(Reconciliation {
            entries: Vec::new(),
            balance: child.balance,
        });
    }

    let total = Decimal::from(due_dates.len())
        .checked_mul(child.monthly_allowance)
        .ok_or_else(|| {
            Error::InvalidAmount(format!(
                "paying {} allowance(s) of {} overflows",
                due_dates.len(),
                child.monthly_allowance
            ))
        })?;

    let mut entries = Vec::with_capacity(due_dates.len());
    for date in due_dates {
        let entry = insert_ledger_entry(
            NewLedgerEntry {
                child_id: child.id,
                amount: child.monthly_allowance,
                description: format!("Allowance for {} {}", date.month(), date.year()),
                kind: EntryKind::Allowance,
                date,
            },
            connection,
        )?;
        entries.push(entry);
    }

    let balance = increment_balance(child.id, total, connection)?;

    tracing::info!(
        "Paid {} allowance(s) totalling {total} to child {}",
        entries.len(),
        child.id
    );

    Ok(Reconciliation { entries, balance })
}
