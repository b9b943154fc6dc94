//! The JSON endpoint for period reports.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;

use crate::{
    AppState, Error, ReportConfig, UserID,
    ledger::SqliteLedger,
    period::PeriodQuery,
    report::{ReportOut, get_report},
};

/// The state needed to build reports.
#[derive(Debug, Clone)]
pub struct ReportState {
    /// The database connection holding the ledger.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Settings applied to every report.
    pub report_config: ReportConfig,
}

impl FromRef<AppState> for ReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            report_config: state.report_config.clone(),
        }
    }
}

/// Get the report for `?month=YYYY-MM` or `?start=YYYY-MM&end=YYYY-MM`.
pub async fn get_report_endpoint(
    State(state): State<ReportState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ReportOut>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let report = get_report(
        user_id,
        &query,
        &SqliteLedger::new(&connection),
        &state.report_config,
    )?;

    Ok(Json(report))
}

#[cfg(test)]
mod report_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Json,
        extract::{Query, State},
    };
    use time::macros::date;

    use crate::{
        Error, ReportConfig,
        category::Kind,
        period::PeriodQuery,
        test_utils::{create_test_user, get_test_connection},
        transaction::{Transaction, create_transaction},
    };

    use super::{ReportState, get_report_endpoint};

    #[tokio::test]
    async fn returns_report_in_configured_currency() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        create_transaction(
            user.id,
            Transaction::build(3200.0, date!(2025 - 09 - 01), "Salary").kind(Some(Kind::Income)),
            &connection,
        )
        .unwrap();
        let state = ReportState {
            db_connection: Arc::new(Mutex::new(connection)),
            report_config: ReportConfig {
                currency: "NZD".to_owned(),
            },
        };

        let Json(report) = get_report_endpoint(
            State(state),
            Extension(user.id),
            Query(PeriodQuery::month("2025-09")),
        )
        .await
        .unwrap();

        assert_eq!(report.currency, "NZD");
        assert_eq!(report.kpis.income_total, 3200.0);
        assert_eq!(report.kpis.savings_rate, 100.0);
    }

    #[tokio::test]
    async fn missing_period_is_invalid() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let state = ReportState {
            db_connection: Arc::new(Mutex::new(connection)),
            report_config: ReportConfig::default(),
        };

        let result = get_report_endpoint(
            State(state),
            Extension(user.id),
            Query(PeriodQuery {
                start: Some("2025-09".to_owned()),
                ..Default::default()
            }),
        )
        .await;

        assert!(matches!(result, Err(Error::InvalidPeriod(_))));
    }
}
