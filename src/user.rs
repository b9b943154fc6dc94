//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error, PasswordHash,
    timestamp::{format_timestamp, get_optional_timestamp, get_timestamp, now_utc},
};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
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

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The user's display name.
    pub name: String,
    /// The user's email address, stored in lower case.
    pub email: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// Inactive users cannot log in.
    pub is_active: bool,
    /// When the user registered.
    pub created_at: OffsetDateTime,
    /// When the user last logged in, if ever.
    pub last_log_in_at: Option<OffsetDateTime>,
}

/// The public view of a [User], without the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// The user's ID.
    pub id: i64,
    /// The user's display name.
    pub name: String,
    /// The user's email address.
    pub email: String,
    /// Whether the user may log in.
    pub is_active: bool,
    /// When the user registered, e.g. "2025-09-01 08:15:00" (UTC).
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.as_i64(),
            name: user.name.clone(),
            email: user.email.clone(),
            is_active: user.is_active,
            created_at: format_timestamp(user.created_at),
        }
    }
}

/// Validate and normalise an email address.
///
/// Emails are compared case-insensitively, so they are stored in lower case.
///
/// # Errors
/// Returns [Error::InvalidEmail] if `email` does not look like `local@domain.tld`.
pub fn normalize_email(email: &str) -> Result<String, Error> {
    let email = email.trim().to_lowercase();

    let is_valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if is_valid {
        Ok(email)
    } else {
        Err(Error::InvalidEmail(email))
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
                password TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                last_log_in_at TEXT
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// `email` should already be normalised with [normalize_email].
///
/// # Errors
///
/// This function will return a:
/// - [Error::EmptyName] if `name` is blank,
/// - [Error::DuplicateEmail] if the email is already registered,
/// - or [Error::SqlError] if some other SQL error occurred.
pub fn create_user(
    name: &str,
    email: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::EmptyName("name"));
    }

    let created_at = now_utc();

    connection
        .execute(
            "INSERT INTO user (name, email, password, created_at) VALUES (?1, ?2, ?3, ?4)",
            (name, email, password_hash.as_ref(), format_timestamp(created_at)),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateEmail,
            error => error.into(),
        })?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        name: name.to_owned(),
        email: email.to_owned(),
        password_hash,
        is_active: true,
        created_at,
        last_log_in_at: None,
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
        .prepare(
            "SELECT id, name, email, password, is_active, created_at, last_log_in_at
             FROM user WHERE id = :id",
        )?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user registered with `email`, compared case-insensitively.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has registered with `email`.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, name, email, password, is_active, created_at, last_log_in_at
             FROM user WHERE email = :email",
        )?
        .query_row(&[(":email", &email.trim().to_lowercase())], map_user_row)
        .map_err(|error| error.into())
}

/// Record that the user logged in at `at`.
pub fn record_log_in(
    user_id: UserID,
    at: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET last_log_in_at = ?1 WHERE id = ?2",
        (format_timestamp(at), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(3)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        is_active: row.get(4)?,
        created_at: get_timestamp(row, 5)?,
        last_log_in_at: get_optional_timestamp(row, 6)?,
    })
}
