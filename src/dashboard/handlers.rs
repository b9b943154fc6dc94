//! Dashboard HTTP handler.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, UserID,
    dashboard::{DashboardSummary, build_summary},
    ledger::SqliteLedger,
    period::YearMonth,
};

/// The state needed for the dashboard summary.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection holding the ledger.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query string for the dashboard summary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    /// The month to summarise, "YYYY-MM". Required.
    pub month: Option<String>,
}

/// Get the summary for `?month=YYYY-MM`.
pub async fn get_dashboard_summary(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardSummary>, Error> {
    let month = match query.month.as_deref().map(str::trim) {
        Some(month) if !month.is_empty() => YearMonth::parse(month)?,
        _ => {
            return Err(Error::InvalidPeriod("provide ?month=YYYY-MM".to_owned()));
        }
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let summary = build_summary(user_id, month, &SqliteLedger::new(&connection))?;

    Ok(Json(summary))
}

#[cfg(test)]
mod dashboard_handler_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Json,
        extract::{Query, State},
    };

    use crate::{
        Error,
        test_utils::{create_test_user, get_test_connection},
    };

    use super::{DashboardQuery, DashboardState, get_dashboard_summary};

    #[tokio::test]
    async fn returns_summary_for_month() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let state = DashboardState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let Json(summary) = get_dashboard_summary(
            State(state),
            Extension(user.id),
            Query(DashboardQuery {
                month: Some("2025-02".to_owned()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(summary.month, "2025-02");
    }

    #[tokio::test]
    async fn month_is_required() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let state = DashboardState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let missing = get_dashboard_summary(
            State(state.clone()),
            Extension(user.id),
            Query(DashboardQuery::default()),
        )
        .await;
        let malformed = get_dashboard_summary(
            State(state),
            Extension(user.id),
            Query(DashboardQuery {
                month: Some("2025-2".to_owned()),
            }),
        )
        .await;

        assert!(matches!(missing, Err(Error::InvalidPeriod(_))));
        assert!(matches!(malformed, Err(Error::InvalidPeriod(_))));
    }
}
