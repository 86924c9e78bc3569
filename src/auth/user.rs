//! Code for creating the user table and fetching users from the database.
//!
//! Parents and children both log in, so they share one table and are told
//! apart by their [Role].

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{Error, auth::PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
///
/// A child's ID in the child table is the same as their user ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Whether a user is a parent or a child.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Parents manage allowances and record earnings for their children.
    Parent,
    /// Children can view their own balance and earnings.
    Child,
}

impl Role {
    /// The role as it is stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Parent => "parent",
            Role::Child => "child",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parent" => Ok(Role::Parent),
            "child" => Ok(Role::Child),
            other => Err(format!("unknown role \"{other}\"")),
        }
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: String| FromSqlError::Other(error.into()))
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The user's display name.
    pub name: String,
    /// The email the user logs in with, in lowercase.
    pub email: String,
    /// Whether the user is a parent or child.
    pub role: Role,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

/// The data needed to register a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: PasswordHash,
}

/// Check that `raw_email` looks like an email address and normalise it.
///
/// Only a basic structural check is done: there must be some text either side
/// of a single '@'. Emails are compared case-insensitively, so the returned
/// email is lowercase.
///
/// # Errors
/// Returns [Error::InvalidEmail] if the email does not look like an email address.
pub fn normalize_email(raw_email: &str) -> Result<String, Error> {
    let email = raw_email.trim().to_lowercase();

    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace) =>
        {
            Ok(email)
        }
        _ => Err(Error::InvalidEmail(raw_email.to_owned())),
    }
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL CHECK (role IN ('parent', 'child')),
                password TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns:
/// - [Error::DuplicateEmail] if the email is already registered.
/// - [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (name, email, role, password) VALUES (?1, ?2, ?3, ?4)",
        (
            &new_user.name,
            &new_user.email,
            new_user.role,
            new_user.password_hash.as_ref(),
        ),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        name: new_user.name,
        email: new_user.email,
        role: new_user.role,
        password_hash: new_user.password_hash,
    })
}

fn map_row_to_user(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(4)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, name, email, role, password FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], map_row_to_user)
        .map_err(|error| error.into())
}

/// Get the user from the database that registered with `email`.
///
/// `email` is matched case-insensitively.
///
/// # Errors
///
/// This function will return an error if:
/// - `email` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, name, email, role, password FROM user WHERE email = :email")?
        .query_row(
            &[(":email", &email.trim().to_lowercase())],
            map_row_to_user,
        )
        .map_err(|error| error.into())
}

/// Replace the password hash of the user with `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if `user_id` does not belong to a registered user.
pub fn update_password(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        (password_hash.as_ref(), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}
