//! Defines the core data models and database queries for transactions.

use rusqlite::{Connection, Row};
use time::{Date, OffsetDateTime};

use crate::{
    Error, UserID,
    category::{Kind, get_usable_category},
    database_id::{CategoryId, TransactionId},
    timestamp::{format_timestamp, get_optional_timestamp, get_timestamp, now_utc, start_of_day},
};

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that recorded the transaction.
    pub user_id: UserID,
    /// The category the transaction is filed under, if any.
    pub category_id: Option<CategoryId>,
    /// Whether money came in or went out.
    ///
    /// Copied from the category when the transaction is created, so later
    /// changes to the category do not rewrite history.
    pub kind: Kind,
    /// The amount of money spent or earned, always greater than zero.
    pub amount: f64,
    /// When the transaction happened.
    pub occurred_at: OffsetDateTime,
    /// A short description of what the transaction was for.
    pub title: String,
    /// Free text notes.
    pub note: Option<String>,
    /// When the transaction was deleted. Deleted transactions are kept but
    /// ignored everywhere.
    pub deleted_at: Option<OffsetDateTime>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(amount: f64, date: Date, title: &str) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            date,
            title: title.to_owned(),
            note: None,
            category_id: None,
            kind: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// A transaction either has a category, in which case its kind is taken from
/// the category, or it has no category and an explicit kind.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The amount of money, must be greater than zero.
    pub amount: f64,
    /// The day the transaction happened, no later than today.
    pub date: Date,
    /// A short description, e.g. "Weekly groceries".
    pub title: String,
    /// Optional notes.
    pub note: Option<String>,
    /// The category to file the transaction under.
    pub category_id: Option<CategoryId>,
    /// The kind of an uncategorised transaction. Ignored when `category_id` is set.
    pub kind: Option<Kind>,
}

impl TransactionBuilder {
    /// Set the note for the transaction.
    pub fn note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }

    /// Set the category for the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the kind of an uncategorised transaction.
    pub fn kind(mut self, kind: Option<Kind>) -> Self {
        self.kind = kind;
        self
    }
}

/// The changes to apply to a transaction. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionChanges {
    /// A new title.
    pub title: Option<String>,
    /// A new amount.
    pub amount: Option<f64>,
    /// A new date.
    pub date: Option<Date>,
    /// A new note.
    pub note: Option<String>,
    /// A new category. The transaction takes on the new category's kind.
    pub category_id: Option<CategoryId>,
}

// ============================================================================
// VALIDATION
// ============================================================================

fn validate_amount(amount: f64) -> Result<f64, Error> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(Error::InvalidAmount)
    }
}

fn validate_date(date: Date) -> Result<Date, Error> {
    if date > OffsetDateTime::now_utc().date() {
        Err(Error::FutureDate(date))
    } else {
        Ok(date)
    }
}

fn validate_title(title: &str) -> Result<String, Error> {
    let title = title.trim();

    if title.is_empty() {
        Err(Error::EmptyName("title"))
    } else {
        Ok(title.to_owned())
    }
}

/// Work out the kind of a transaction from its category, or from `kind` if it
/// has no category.
fn resolve_kind(
    user_id: UserID,
    category_id: Option<CategoryId>,
    kind: Option<Kind>,
    connection: &Connection,
) -> Result<Kind, Error> {
    match (category_id, kind) {
        (Some(category_id), _) => Ok(get_usable_category(user_id, category_id, connection)?.kind),
        (None, Some(kind)) => Ok(kind),
        (None, None) => Err(Error::InvalidCategory(None)),
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const COLUMNS: &str = "id, user_id, category_id, kind, amount, occurred_at, title, note, deleted_at";

/// Create a new transaction for `user_id` in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is not greater than zero,
/// - [Error::FutureDate] if the date is after today (UTC),
/// - [Error::EmptyName] if the title is blank,
/// - [Error::InvalidCategory] if the category is not usable by the user, or
///   if there is neither a category nor a kind,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    user_id: UserID,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let amount = validate_amount(builder.amount)?;
    let date = validate_date(builder.date)?;
    let title = validate_title(&builder.title)?;
    let kind = resolve_kind(user_id, builder.category_id, builder.kind, connection)?;
    let now = format_timestamp(now_utc());

    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\"
                (user_id, category_id, kind, amount, occurred_at, title, note, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             RETURNING {COLUMNS}"
        ))?
        .query_row(
            (
                user_id.as_i64(),
                builder.category_id,
                kind,
                amount,
                format_timestamp(start_of_day(date)),
                title,
                builder.note,
                now,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve one of the user's transactions by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a live transaction owned by the user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    user_id: UserID,
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {COLUMNS} FROM \"transaction\"
             WHERE id = :id AND user_id = :user_id AND deleted_at IS NULL"
        ))?
        .query_row(
            &[(":id", &id), (":user_id", &user_id.as_i64())],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Apply `changes` to one of the user's transactions.
///
/// Changing the category re-derives the transaction's kind from the new category.
///
/// # Errors
/// Returns the same errors as [create_transaction] for invalid fields, and
/// [Error::NotFound] if the transaction does not exist.
pub fn update_transaction(
    user_id: UserID,
    id: TransactionId,
    changes: TransactionChanges,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let mut transaction = get_transaction(user_id, id, connection)?;

    if let Some(category_id) = changes.category_id {
        if transaction.category_id != Some(category_id) {
            transaction.kind = get_usable_category(user_id, category_id, connection)?.kind;
            transaction.category_id = Some(category_id);
        }
    }
    if let Some(title) = changes.title {
        transaction.title = validate_title(&title)?;
    }
    if let Some(amount) = changes.amount {
        transaction.amount = validate_amount(amount)?;
    }
    if let Some(date) = changes.date {
        transaction.occurred_at = start_of_day(validate_date(date)?);
    }
    if let Some(note) = changes.note {
        transaction.note = Some(note);
    }

    connection.execute(
        "UPDATE \"transaction\"
         SET category_id = ?1, kind = ?2, amount = ?3, occurred_at = ?4, title = ?5, note = ?6,
             updated_at = ?7
         WHERE id = ?8 AND user_id = ?9",
        (
            transaction.category_id,
            transaction.kind,
            transaction.amount,
            format_timestamp(transaction.occurred_at),
            &transaction.title,
            &transaction.note,
            format_timestamp(now_utc()),
            id,
            user_id.as_i64(),
        ),
    )?;

    Ok(transaction)
}

/// Soft delete one of the user's transactions.
///
/// The row is kept with a deletion timestamp and excluded from every query.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or was already deleted.
pub fn delete_transaction(
    user_id: UserID,
    id: TransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE \"transaction\" SET deleted_at = ?1
         WHERE id = ?2 AND user_id = ?3 AND deleted_at IS NULL",
        (format_timestamp(now_utc()), id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            category_id INTEGER REFERENCES category(id) ON UPDATE CASCADE ON DELETE RESTRICT,
            kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
            amount REAL NOT NULL CHECK (amount > 0),
            occurred_at TEXT NOT NULL,
            title TEXT NOT NULL,
            note TEXT,
            deleted_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_user_occurred
            ON \"transaction\"(user_id, occurred_at);
        CREATE INDEX IF NOT EXISTS idx_transaction_category
            ON \"transaction\"(category_id);",
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
///
/// Expects the columns in the order of `COLUMNS`.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        category_id: row.get(2)?,
        kind: row.get(3)?,
        amount: row.get(4)?,
        occurred_at: get_timestamp(row, 5)?,
        title: row.get(6)?,
        note: row.get(7)?,
        deleted_at: get_optional_timestamp(row, 8)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
