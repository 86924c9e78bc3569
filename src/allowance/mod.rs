//! The allowance accrual engine.

mod engine;
mod schedule;

pub use crate::child::get_child_snapshot;
pub use engine::{
    DEFAULT_EARNINGS_DESCRIPTION, Reconciliation, add_earnings, get_earnings_history,
    reconcile_allowance, update_allowance,
};
pub use schedule::{MAX_OCCURRENCES, Occurrences};
