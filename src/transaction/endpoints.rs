//! JSON endpoints for transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, UserID,
    category::Kind,
    database_id::{CategoryId, TransactionId},
    timestamp::parse_date,
    transaction::{
        Transaction, TransactionChanges, TransactionFilter, TransactionQuery, create_transaction,
        delete_transaction, get_transaction, list_transactions, update_transaction,
    },
};

/// The state needed by the transaction endpoints.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// JSON body for creating a transaction.
///
/// `type` is only read when `categoryId` is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionForm {
    pub title: String,
    pub amount: f64,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default, rename = "type")]
    pub kind: Option<Kind>,
    /// "YYYY-MM-DD"
    pub date: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// JSON body for updating a transaction. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdateForm {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// The JSON representation of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: TransactionId,
    pub title: String,
    pub amount: f64,
    pub category_id: Option<CategoryId>,
    /// "YYYY-MM-DD"
    pub date: String,
    pub note: Option<String>,
    #[serde(rename = "type")]
    pub kind: Kind,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            title: transaction.title,
            amount: transaction.amount,
            category_id: transaction.category_id,
            date: transaction.occurred_at.date().to_string(),
            note: transaction.note,
            kind: transaction.kind,
        }
    }
}

/// List the user's transactions, most recent first.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<TransactionResponse>>, Error> {
    let filter = TransactionFilter::try_from(query)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions = list_transactions(user_id, &filter, &connection)?
        .into_iter()
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(transactions))
}

/// Record a new transaction.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Json(form): Json<TransactionForm>,
) -> Result<(StatusCode, Json<TransactionResponse>), Error> {
    let date = parse_date(&form.date)?;
    let builder = Transaction::build(form.amount, date, &form.title)
        .category_id(form.category_id)
        .kind(form.kind)
        .note(form.note);

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = create_transaction(user_id, builder, &connection)?;

    Ok((StatusCode::CREATED, Json(transaction.into())))
}

/// Get one of the user's transactions.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<TransactionResponse>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = get_transaction(user_id, transaction_id, &connection)?;

    Ok(Json(transaction.into()))
}

/// Update one of the user's transactions.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
    Json(form): Json<TransactionUpdateForm>,
) -> Result<Json<TransactionResponse>, Error> {
    let changes = TransactionChanges {
        title: form.title,
        amount: form.amount,
        date: form.date.as_deref().map(parse_date).transpose()?,
        note: form.note,
        category_id: form.category_id,
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = update_transaction(user_id, transaction_id, changes, &connection)?;

    Ok(Json(transaction.into()))
}

/// Soft delete one of the user's transactions.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    delete_transaction(user_id, transaction_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
