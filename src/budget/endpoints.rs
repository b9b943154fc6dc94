//! JSON endpoints for budgets.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState, Error, UserID,
    budget::{
        BudgetForm, BudgetResponse, BudgetUpdateForm, create_budget, delete_budget, get_budget,
        list_budgets, update_budget,
    },
    database_id::BudgetId,
    period::YearMonth,
};

/// The state needed by the budget endpoints.
#[derive(Debug, Clone)]
pub struct BudgetState {
    /// The database connection for managing budgets.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query string for listing budgets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BudgetQuery {
    /// Only list budgets for this "YYYY-MM" month.
    pub month: Option<String>,
}

/// List the user's budgets, newest first.
pub async fn list_budgets_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<BudgetQuery>,
) -> Result<Json<Vec<BudgetResponse>>, Error> {
    let month = query
        .month
        .as_deref()
        .filter(|month| !month.is_empty())
        .map(YearMonth::parse)
        .transpose()?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let budgets = list_budgets(user_id, month, &connection)?
        .into_iter()
        .map(BudgetResponse::from)
        .collect();

    Ok(Json(budgets))
}

/// Create a budget.
pub async fn create_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    Json(form): Json<BudgetForm>,
) -> Result<(StatusCode, Json<BudgetResponse>), Error> {
    let new_budget = form.validate()?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let budget = create_budget(user_id, new_budget, &connection)?;

    Ok((StatusCode::CREATED, Json(budget.into())))
}

/// Get one of the user's budgets.
pub async fn get_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    Path(budget_id): Path<BudgetId>,
) -> Result<Json<BudgetResponse>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    Ok(Json(get_budget(user_id, budget_id, &connection)?.into()))
}

/// Update one of the user's budgets.
pub async fn update_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    Path(budget_id): Path<BudgetId>,
    Json(form): Json<BudgetUpdateForm>,
) -> Result<Json<BudgetResponse>, Error> {
    let changes = form.validate()?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let budget = update_budget(user_id, budget_id, changes, &connection)?;

    Ok(Json(budget.into()))
}

/// Delete one of the user's budgets, responding with the deleted ID.
pub async fn delete_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    Path(budget_id): Path<BudgetId>,
) -> Result<Json<Value>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    delete_budget(user_id, budget_id, &connection)?;

    Ok(Json(json!({ "id": budget_id })))
}

#[cfg(test)]
mod budget_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Json,
        extract::{Path, Query, State},
        http::StatusCode,
    };
    use serde_json::json;

    use crate::{
        Error,
        budget::{BudgetForm, BudgetUpdateForm},
        test_utils::{create_test_user, get_test_connection},
    };

    use super::{
        BudgetQuery, BudgetState, create_budget_endpoint, delete_budget_endpoint,
        get_budget_endpoint, list_budgets_endpoint, update_budget_endpoint,
    };

    fn form(month: &str, limit: f64) -> BudgetForm {
        BudgetForm {
            category_id: None,
            month: month.to_owned(),
            limit,
            notify: true,
        }
    }

    #[tokio::test]
    async fn create_update_and_list() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let state = BudgetState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let (status, Json(created)) = create_budget_endpoint(
            State(state.clone()),
            Extension(user.id),
            Json(form("2025-09", 300.0)),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.month, "2025-09");

        let Json(updated) = update_budget_endpoint(
            State(state.clone()),
            Extension(user.id),
            Path(created.id),
            Json(BudgetUpdateForm {
                limit: Some(250.0),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.limit, 250.0);

        let Json(listed) = list_budgets_endpoint(
            State(state),
            Extension(user.id),
            Query(BudgetQuery {
                month: Some("2025-09".to_owned()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(listed, vec![updated]);
    }

    #[tokio::test]
    async fn create_rejects_bad_month() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let state = BudgetState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let result =
            create_budget_endpoint(State(state), Extension(user.id), Json(form("2025-9", 300.0)))
                .await;

        assert!(matches!(result, Err(Error::InvalidPeriod(_))));
    }

    #[tokio::test]
    async fn delete_returns_id() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let state = BudgetState {
            db_connection: Arc::new(Mutex::new(connection)),
        };
        let (_, Json(created)) = create_budget_endpoint(
            State(state.clone()),
            Extension(user.id),
            Json(form("2025-09", 300.0)),
        )
        .await
        .unwrap();

        let Json(body) =
            delete_budget_endpoint(State(state.clone()), Extension(user.id), Path(created.id))
                .await
                .unwrap();
        let result = get_budget_endpoint(State(state), Extension(user.id), Path(created.id)).await;

        assert_eq!(body, json!({ "id": created.id }));
        assert!(matches!(result, Err(Error::NotFound)));
    }
}
