//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use time::Date;

use crate::{alert::Alert, internal_server_error::InternalServerError, not_found::NotFoundError};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The email and password combination did not match a registered user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The auth token cookie is missing from the cookie jar in the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// The auth token cookie could not be decoded, or it has expired.
    #[error("invalid auth token: {0}")]
    InvalidToken(String),

    /// There was an error formatting or computing the expiry date time of the
    /// auth cookie.
    #[error("could not set the auth cookie expiry: {0}")]
    InvalidDateFormat(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The email address is not a valid email address.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The email address is already used by another user.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// A name was empty or only contained whitespace.
    #[error("name cannot be empty")]
    EmptyName,

    /// An amount of money could not be parsed, or it is outside the allowed
    /// range for the operation (e.g., non-positive earnings).
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The day of the month for paying the allowance must be between 1 and 31.
    #[error("{0} is not a valid allowance day, it must be between 1 and 31")]
    InvalidAllowanceDay(i64),

    /// A date string could not be parsed as a calendar date.
    #[error("\"{0}\" is not a valid date, use the format YYYY-MM-DD")]
    InvalidDate(String),

    /// Reconciling the allowance from the start date would create an
    /// unreasonable number of ledger entries.
    ///
    /// This usually means the start date was entered incorrectly.
    #[error("the allowance start date {0} is too far in the past")]
    AllowanceRangeTooLong(Date),

    /// The logged in user is not allowed to access the resource.
    #[error("you do not have permission to access this page")]
    Forbidden,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl Error {
    /// Whether the error was caused by invalid user input, as opposed to a
    /// failure in the store or server.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Error::TooWeak(_)
                | Error::InvalidEmail(_)
                | Error::DuplicateEmail
                | Error::EmptyName
                | Error::InvalidAmount(_)
                | Error::InvalidAllowanceDay(_)
                | Error::InvalidDate(_)
                | Error::AllowanceRangeTooLong(_)
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => NotFoundError.into_response(),
            Error::Forbidden => (
                StatusCode::FORBIDDEN,
                InternalServerError {
                    description: "Access Denied",
                    fix: "You do not have permission to view this page.",
                }
                .into_html(),
            )
                .into_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::InvalidAmount(details) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid amount".to_owned(),
                    details,
                },
            ),
            Error::InvalidAllowanceDay(day) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid allowance day".to_owned(),
                    details: format!(
                        "{day} is not a day of the month. Choose a day between 1 and 31."
                    ),
                },
            ),
            Error::InvalidDate(date) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid date".to_owned(),
                    details: format!("\"{date}\" is not a valid date. Use the format YYYY-MM-DD."),
                },
            ),
            Error::AllowanceRangeTooLong(date) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Start date too far in the past".to_owned(),
                    details: format!(
                        "Paying the allowance from {date} would create too many payments. \
                        Check that the start date is correct."
                    ),
                },
            ),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Child not found".to_owned(),
                    details: "The child could not be found. \
                        Try refreshing the page and check that the child has been registered."
                        .to_owned(),
                },
            ),
            Error::Forbidden => (
                StatusCode::FORBIDDEN,
                Alert::Error {
                    message: "Access denied".to_owned(),
                    details: "Only parents can change allowances and earnings.".to_owned(),
                },
            ),
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Invalid Timezone Settings".to_owned(),
                    details: format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                    ),
                },
            ),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::Error {
                        message: "Something went wrong".to_owned(),
                        details:
                            "An unexpected error occurred, check the server logs for more details."
                                .to_owned(),
                    },
                )
            }
        };

        (status_code, alert.into_html()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::Error;

    #[test]
    fn no_rows_maps_to_not_found() {
        let connection = Connection::open_in_memory().unwrap();

        let error: Error = connection
            .query_row("SELECT 1 WHERE 0", [], |row| row.get::<_, i64>(0))
            .unwrap_err()
            .into();

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn unique_email_maps_to_duplicate_email() {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute("CREATE TABLE user (id INTEGER PRIMARY KEY, email TEXT UNIQUE)", ())
            .unwrap();
        connection
            .execute("INSERT INTO user (email) VALUES ('a@b.c')", ())
            .unwrap();

        let error: Error = connection
            .execute("INSERT INTO user (email) VALUES ('a@b.c')", ())
            .unwrap_err()
            .into();

        assert_eq!(error, Error::DuplicateEmail);
    }

    #[test]
    fn validation_errors_are_classified() {
        assert!(Error::InvalidAmount("-5".to_owned()).is_validation_error());
        assert!(Error::InvalidAllowanceDay(32).is_validation_error());
        assert!(!Error::NotFound.is_validation_error());
        assert!(!Error::DatabaseLockError.is_validation_error());
    }
}
