//! Opens the application database and creates its tables.

use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{auth::create_user_table, child::create_child_table, ledger::create_ledger_table};

/// How long a connection waits for another writer before giving up.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create the tables for the application if they do not exist.
///
/// Also turns on foreign key enforcement and sets [BUSY_TIMEOUT] for
/// `connection`. Both are per-connection settings, so this must be called on
/// every new connection.
///
/// # Errors
/// Returns an error if a pragma could not be set or a table could not be
/// created. No tables are created if an error is returned.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    // Foreign keys cannot be turned on inside a transaction.
    connection.pragma_update(None, "foreign_keys", "ON")?;
    connection.busy_timeout(BUSY_TIMEOUT)?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_child_table(&transaction)?;
    create_ledger_table(&transaction)?;

    transaction.commit()
}
