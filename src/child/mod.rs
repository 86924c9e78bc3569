mod allowance_endpoint;
mod core;
mod earnings_endpoint;
mod page;

pub use allowance_endpoint::update_allowance_endpoint;
pub use core::{
    AllowanceDay, AllowanceSettings, Child, ChildSnapshot, create_child, create_child_table,
    get_child, get_child_for_user, get_child_snapshot, get_children_for_parent,
    increment_balance, set_allowance_settings,
};
pub use earnings_endpoint::add_earnings_endpoint;
pub use page::get_child_page;
pub(crate) use page::{history_table, stat_card};

#[cfg(test)]
pub(crate) use core::test_utils;
