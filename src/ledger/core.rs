//! The append-only ledger of money credited to each child.

use std::fmt::Display;

use rusqlite::{
    Connection, OptionalExtension, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use time::Date;

use crate::{
    Error,
    amount::{get_decimal, to_sql_text},
    auth::UserID,
};

pub type LedgerEntryId = i64;

/// What a ledger entry was paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A monthly allowance payment.
    Allowance,
    /// Extra earnings recorded by a parent, e.g. for chores.
    Extra,
}

impl EntryKind {
    fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Allowance => "allowance",
            EntryKind::Extra => "extra",
        }
    }
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Allowance => write!(f, "Allowance"),
            EntryKind::Extra => write!(f, "Extra"),
        }
    }
}

impl ToSql for EntryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for EntryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "allowance" => Ok(EntryKind::Allowance),
            "extra" => Ok(EntryKind::Extra),
            other => Err(FromSqlError::Other(
                format!("unknown ledger entry kind \"{other}\"").into(),
            )),
        }
    }
}

/// An amount of money credited to a child.
///
/// Entries are never changed or deleted once they are recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub child_id: UserID,
    pub amount: Decimal,
    pub description: String,
    pub kind: EntryKind,
    /// The date the allowance fell due, or the date extra earnings were recorded.
    pub date: Date,
}

/// A ledger entry that has not been recorded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub child_id: UserID,
    pub amount: Decimal,
    pub description: String,
    pub kind: EntryKind,
    pub date: Date,
}

pub fn create_ledger_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS ledger_entry (
            id INTEGER PRIMARY KEY,
            child_id INTEGER NOT NULL REFERENCES child(id),
            amount TEXT NOT NULL,
            description TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('allowance', 'extra')),
            date TEXT NOT NULL
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_ledger_entry_child_date
        ON ledger_entry(child_id, date)",
        (),
    )?;

    Ok(())
}

/// Append `entry` to the ledger.
///
/// This does not change the child's balance, see
/// [increment_balance](crate::child::increment_balance).
pub fn insert_ledger_entry(
    entry: NewLedgerEntry,
    connection: &Connection,
) -> Result<LedgerEntry, Error> {
    connection.execute(
        "INSERT INTO ledger_entry (child_id, amount, description, kind, date)
        VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            entry.child_id.as_i64(),
            to_sql_text(entry.amount),
            &entry.description,
            entry.kind,
            entry.date,
        ),
    )?;

    Ok(LedgerEntry {
        id: connection.last_insert_rowid(),
        child_id: entry.child_id,
        amount: entry.amount,
        description: entry.description,
        kind: entry.kind,
        date: entry.date,
    })
}

fn map_row_to_ledger_entry(row: &Row) -> Result<LedgerEntry, rusqlite::Error> {
    Ok(LedgerEntry {
        id: row.get(0)?,
        child_id: UserID::new(row.get(1)?),
        amount: get_decimal(row, 2)?,
        description: row.get(3)?,
        kind: row.get(4)?,
        date: row.get(5)?,
    })
}

/// The date of the most recent allowance payment for the child, if any.
pub fn get_last_allowance_date(
    child_id: UserID,
    connection: &Connection,
) -> Result<Option<Date>, Error> {
    connection
        .query_row(
            "SELECT date FROM ledger_entry
            WHERE child_id = ?1 AND kind = ?2
            ORDER BY date DESC, id DESC
            LIMIT 1",
            (child_id.as_i64(), EntryKind::Allowance),
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
}

/// All ledger entries for the child, newest first.
pub fn get_ledger_entries(
    child_id: UserID,
    connection: &Connection,
) -> Result<Vec<LedgerEntry>, Error> {
    connection
        .prepare(
            "SELECT id, child_id, amount, description, kind, date FROM ledger_entry
            WHERE child_id = :child_id
            ORDER BY date DESC, id DESC",
        )?
        .query_map(&[(":child_id", &child_id.as_i64())], map_row_to_ledger_entry)?
        .map(|maybe_entry| maybe_entry.map_err(Error::from))
        .collect()
}

/// The sum of every ledger entry for the child.
#[cfg(test)]
pub fn sum_ledger(child_id: UserID, connection: &Connection) -> Result<Decimal, Error> {
    let mut statement =
        connection.prepare("SELECT amount FROM ledger_entry WHERE child_id = :child_id")?;

    let amounts = statement.query_map(&[(":child_id", &child_id.as_i64())], |row| {
        get_decimal(row, 0)
    })?;

    let mut total = Decimal::ZERO;
    for amount in amounts {
        total += amount?;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use time::macros::date;

    use crate::{
        auth::UserID,
        child::test_utils::{
            PARENT_EMAIL, get_test_connection, must_create_child, must_create_parent,
        },
    };

    use super::{
        EntryKind, NewLedgerEntry, get_last_allowance_date, get_ledger_entries,
        insert_ledger_entry, sum_ledger,
    };

    fn new_entry(child_id: UserID, amount: i64, kind: EntryKind, date: time::Date) -> NewLedgerEntry {
        NewLedgerEntry {
            child_id,
            amount: Decimal::from(amount),
            description: "test".to_owned(),
            kind,
            date,
        }
    }

    #[test]
    fn entries_are_returned_newest_first() {
        let connection = get_test_connection();
        must_create_parent(PARENT_EMAIL, &connection);
        let child = must_create_child("Alice", PARENT_EMAIL, &connection);
        let first = insert_ledger_entry(
            new_entry(child.id, 10, EntryKind::Allowance, date!(2023 - 02 - 01)),
            &connection,
        )
        .unwrap();
        let third = insert_ledger_entry(
            new_entry(child.id, 5, EntryKind::Extra, date!(2023 - 03 - 01)),
            &connection,
        )
        .unwrap();
        let second = insert_ledger_entry(
            new_entry(child.id, 10, EntryKind::Allowance, date!(2023 - 03 - 01)),
            &connection,
        )
        .unwrap();

        let entries = get_ledger_entries(child.id, &connection).unwrap();

        assert_eq!(entries, vec![second, third, first]);
    }

    #[test]
    fn last_allowance_date_ignores_extra_entries() {
        let connection = get_test_connection();
        must_create_parent(PARENT_EMAIL, &connection);
        let child = must_create_child("Alice", PARENT_EMAIL, &connection);
        insert_ledger_entry(
            new_entry(child.id, 10, EntryKind::Allowance, date!(2023 - 02 - 01)),
            &connection,
        )
        .unwrap();
        insert_ledger_entry(
            new_entry(child.id, 5, EntryKind::Extra, date!(2023 - 04 - 01)),
            &connection,
        )
        .unwrap();

        let last = get_last_allowance_date(child.id, &connection).unwrap();

        assert_eq!(last, Some(date!(2023 - 02 - 01)));
    }

    #[test]
    fn last_allowance_date_is_none_without_payments() {
        let connection = get_test_connection();
        must_create_parent(PARENT_EMAIL, &connection);
        let child = must_create_child("Alice", PARENT_EMAIL, &connection);

        assert_eq!(get_last_allowance_date(child.id, &connection), Ok(None));
    }

    #[test]
    fn sum_ledger_adds_all_entries_for_child() {
        let connection = get_test_connection();
        must_create_parent(PARENT_EMAIL, &connection);
        let alice = must_create_child("Alice", PARENT_EMAIL, &connection);
        let bob = must_create_child("Bob", PARENT_EMAIL, &connection);
        insert_ledger_entry(
            new_entry(alice.id, 10, EntryKind::Allowance, date!(2023 - 02 - 01)),
            &connection,
        )
        .unwrap();
        insert_ledger_entry(
            new_entry(alice.id, 5, EntryKind::Extra, date!(2023 - 02 - 03)),
            &connection,
        )
        .unwrap();
        insert_ledger_entry(
            new_entry(bob.id, 100, EntryKind::Extra, date!(2023 - 02 - 03)),
            &connection,
        )
        .unwrap();

        assert_eq!(sum_ledger(alice.id, &connection), Ok(Decimal::from(15)));
    }

    #[test]
    fn insert_fails_for_unknown_child() {
        let connection = get_test_connection();

        let result = insert_ledger_entry(
            new_entry(UserID::new(42), 10, EntryKind::Extra, date!(2023 - 02 - 01)),
            &connection,
        );

        assert!(result.is_err());
    }
}
