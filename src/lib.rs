//! Ledgerlens is a backend for tracking personal finances.
//!
//! Users register, log in, and record categorised income and expense
//! transactions along with monthly budgets. The library serves a JSON API and
//! turns the transaction ledger into month-over-month analytics: KPIs,
//! cashflow series, category breakdowns, budget utilisation and trend deltas.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use time::Date;
use tokio::signal;

mod app_state;
mod auth;
mod budget;
mod category;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod ledger;
mod logging;
mod password;
mod period;
mod report;
mod routing;
mod timestamp;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::{AppState, ReportConfig};
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use password::PasswordHash;
pub use routing::build_router;
pub use user::{User, UserID};

use crate::database_id::CategoryId;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The report period parameters were missing, malformed, or out of order.
    ///
    /// The string describes what was wrong with the request so that the
    /// client can fix it.
    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    /// One of the queries used to build a report or summary failed.
    ///
    /// The string should only be logged on the server. Clients are sent a
    /// general error message instead.
    #[error("aggregation failed: {0}")]
    AggregationFailed(String),

    /// The email and password combination did not match a user, or the
    /// request did not carry a valid session.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An amount was zero, negative, or not a finite number.
    #[error("amounts must be greater than zero")]
    InvalidAmount,

    /// A date in the future was used to create a transaction.
    ///
    /// Transactions record events that have already happened, therefore future
    /// dates are not allowed.
    #[error("{0} is a date in the future, which is not allowed")]
    FutureDate(Date),

    /// A required text field was empty. The string names the field.
    #[error("{0} cannot be empty")]
    EmptyName(&'static str),

    /// A colour was not a hex colour code such as `#1f2937`.
    #[error("\"{0}\" is not a valid hex colour code")]
    InvalidColor(String),

    /// The email address is not in a valid format.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// A date string could not be parsed.
    #[error("\"{0}\" is not a valid date, expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The category ID does not refer to a category that the user can use.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(Option<CategoryId>),

    /// The user already has a category with this name.
    #[error("the category \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// Transactions still refer to the category, so it cannot be deleted.
    #[error("the category is used by existing transactions")]
    CategoryInUse,

    /// A budget already exists for the same category and month.
    #[error("a budget already exists for this category and month")]
    DuplicateBudget,

    /// The email address is already registered.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

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

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidPeriod(_)
            | Error::InvalidAmount
            | Error::FutureDate(_)
            | Error::EmptyName(_)
            | Error::InvalidColor(_)
            | Error::InvalidEmail(_)
            | Error::InvalidDate(_)
            | Error::InvalidCategory(_)
            | Error::DuplicateCategoryName(_)
            | Error::CategoryInUse
            | Error::DuplicateBudget
            | Error::DuplicateEmail => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::AggregationFailed(_)
            | Error::HashingError(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Any errors that are not handled above are not intended to be shown to the client.
            tracing::error!("An unexpected error occurred: {}", self);
            "An unexpected error occurred, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::Error;

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn invalid_period_is_a_client_error() {
        let response = Error::InvalidPeriod("missing month".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn aggregation_failure_is_a_server_error() {
        let response = Error::AggregationFailed("disk on fire".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_credentials_is_unauthorized() {
        let response = Error::InvalidCredentials.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
