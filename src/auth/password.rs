//! Password strength checks and bcrypt hashing.
//!
//! A [ValidatedPassword] is a plain-text password that is hard enough to guess.
//! It can only be stored after it has been turned into a [PasswordHash].

use std::fmt::Display;

use bcrypt::{hash, verify};
use zxcvbn::{Score, feedback::Feedback, zxcvbn};

use crate::Error;

/// The shortest password accepted, before the strength check is applied.
pub const PASSWORD_MIN_LENGTH: usize = 6;

/// A password that has passed the strength check, but has not been hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Check that `raw_password` is long enough and hard to guess.
    ///
    /// `user_inputs` are words the password should not be built from, such as
    /// the user's name and email.
    ///
    /// # Errors
    /// Returns [Error::TooWeak] with a suggestion for a stronger password.
    pub fn new(raw_password: &str, user_inputs: &[&str]) -> Result<Self, Error> {
        if raw_password.chars().count() < PASSWORD_MIN_LENGTH {
            return Err(Error::TooWeak(format!(
                "use at least {PASSWORD_MIN_LENGTH} characters"
            )));
        }

        let analysis = zxcvbn(raw_password, user_inputs);

        match analysis.score() {
            Score::Three | Score::Four => Ok(Self(raw_password.to_owned())),
            _ => Err(Error::TooWeak(
                analysis
                    .feedback()
                    .unwrap_or(&Feedback::default())
                    .to_string(),
            )),
        }
    }

    /// Wrap `raw_password` without checking it.
    ///
    /// Only for tests and tools that create throwaway accounts.
    pub fn new_unchecked(raw_password: &str) -> Self {
        Self(raw_password.to_owned())
    }
}

impl Display for ValidatedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "********")
    }
}

/// A salted bcrypt hash of a password.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// The recommended bcrypt cost.
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Hash `password` with `cost` rounds of bcrypt.
    ///
    /// # Errors
    /// Returns [Error::HashingError] if bcrypt fails.
    pub fn new(password: ValidatedPassword, cost: u32) -> Result<Self, Error> {
        hash(&password.0, cost)
            .map(Self)
            .map_err(|error| Error::HashingError(error.to_string()))
    }

    /// Wrap a hash read back from the database.
    pub fn new_unchecked(raw_password_hash: &str) -> Self {
        Self(raw_password_hash.to_owned())
    }

    /// Validate and hash `raw_password` in one step.
    pub fn from_raw_password(
        raw_password: &str,
        user_inputs: &[&str],
        cost: u32,
    ) -> Result<Self, Error> {
        PasswordHash::new(ValidatedPassword::new(raw_password, user_inputs)?, cost)
    }

    /// Check whether `raw_password` is the password this hash was made from.
    ///
    /// # Errors
    /// Returns [Error::HashingError] if the stored hash is malformed.
    pub fn verify(&self, raw_password: &str) -> Result<bool, Error> {
        verify(raw_password, &self.0).map_err(|error| Error::HashingError(error.to_string()))
    }
}

impl AsRef<str> for PasswordHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
