//! Checks an email and password against the registered users.

use rusqlite::Connection;

use crate::{
    Error,
    auth::{User, get_user_by_email},
};

/// Somewhere registered users can be looked up by email.
pub trait CredentialStore {
    /// Find the user that registered with `email`.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if no user registered with `email`.
    fn find_user_by_email(&self, email: &str) -> Result<User, Error>;
}

impl CredentialStore for Connection {
    fn find_user_by_email(&self, email: &str) -> Result<User, Error> {
        get_user_by_email(email, self)
    }
}

/// Get the user with `email` if `password` matches their password hash.
///
/// # Errors
/// Returns:
/// - [Error::InvalidCredentials] if the email is not registered or the password is wrong.
/// - [Error::HashingError] if the stored hash could not be checked.
/// - [Error::SqlError] if the store could not be read.
pub fn verify_credentials(
    email: &str,
    password: &str,
    store: &impl CredentialStore,
) -> Result<User, Error> {
    let user = match store.find_user_by_email(email) {
        Ok(user) => user,
        Err(Error::NotFound) => return Err(Error::InvalidCredentials),
        Err(error) => return Err(error),
    };

    if user.password_hash.verify(password)? {
        Ok(user)
    } else {
        Err(Error::InvalidCredentials)
    }
}
