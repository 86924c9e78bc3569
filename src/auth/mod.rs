//! User accounts, passwords and cookie based sessions.

mod cookie;
mod credentials;
mod forgot_password;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod redirect;
mod register;
mod token;
mod user;

pub use cookie::{
    DEFAULT_COOKIE_DURATION, get_token_from_cookies, invalidate_auth_cookie, set_auth_cookie,
};
pub use credentials::{CredentialStore, verify_credentials};
pub use forgot_password::get_forgot_password_page;
pub use log_in::{get_log_in_page, landing_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{AuthState, CurrentUser, auth_guard, auth_guard_hx};
pub use password::{PasswordHash, ValidatedPassword};
pub use register::{
    get_register_child_page, get_register_parent_page, register_child, register_parent,
};
pub use user::{
    NewUser, Role, User, UserID, create_user, create_user_table, get_user_by_email,
    get_user_by_id, normalize_email, update_password,
};

#[cfg(test)]
pub(crate) use cookie::COOKIE_TOKEN;
