mod core;

pub use core::{
    EntryKind, LedgerEntry, LedgerEntryId, NewLedgerEntry, create_ledger_table,
    get_last_allowance_date, get_ledger_entries, insert_ledger_entry,
};

#[cfg(test)]
pub use core::sum_ledger;
