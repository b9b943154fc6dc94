//! Monthly spending limits, either for one category or for uncategorised spending.

use rusqlite::{Connection, Row, types::Type};
use serde::{Deserialize, Serialize};

use crate::{
    Error, UserID,
    category::get_visible_category,
    database_id::{BudgetId, CategoryId},
    period::YearMonth,
    timestamp::{format_timestamp, now_utc},
};

/// A spending limit for one month.
#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The user that set the budget.
    pub user_id: UserID,
    /// The category the limit applies to. `None` is a global budget, which
    /// tracks expenses that have no category.
    pub category_id: Option<CategoryId>,
    /// The month the limit applies to.
    pub month: YearMonth,
    /// The most the user wants to spend, always greater than zero.
    pub limit: f64,
    /// Whether the user wants to be told when they reach the limit.
    pub notify: bool,
}

/// The fields needed to create a budget.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBudget {
    pub category_id: Option<CategoryId>,
    pub month: YearMonth,
    pub limit: f64,
    pub notify: bool,
}

/// The changes to apply to a budget. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetChanges {
    pub category_id: Option<CategoryId>,
    pub month: Option<YearMonth>,
    pub limit: Option<f64>,
    pub notify: Option<bool>,
}

/// JSON body for creating a budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetForm {
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// "YYYY-MM"
    pub month: String,
    pub limit: f64,
    #[serde(default = "default_notify")]
    pub notify: bool,
}

fn default_notify() -> bool {
    true
}

impl BudgetForm {
    /// Validate the month token.
    ///
    /// # Errors
    /// Returns [Error::InvalidPeriod] if `month` is not a `YYYY-MM` token.
    pub fn validate(self) -> Result<NewBudget, Error> {
        Ok(NewBudget {
            category_id: self.category_id,
            month: YearMonth::parse(&self.month)?,
            limit: self.limit,
            notify: self.notify,
        })
    }
}

/// JSON body for updating a budget. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUpdateForm {
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub limit: Option<f64>,
    #[serde(default)]
    pub notify: Option<bool>,
}

impl BudgetUpdateForm {
    /// Validate the month token, if any.
    ///
    /// # Errors
    /// Returns [Error::InvalidPeriod] if `month` is not a `YYYY-MM` token.
    pub fn validate(self) -> Result<BudgetChanges, Error> {
        Ok(BudgetChanges {
            category_id: self.category_id,
            month: self.month.as_deref().map(YearMonth::parse).transpose()?,
            limit: self.limit,
            notify: self.notify,
        })
    }
}

/// The JSON representation of a budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetResponse {
    pub id: BudgetId,
    pub category_id: Option<CategoryId>,
    /// "YYYY-MM"
    pub month: String,
    pub limit: f64,
    pub notify: bool,
}

impl From<Budget> for BudgetResponse {
    fn from(budget: Budget) -> Self {
        Self {
            id: budget.id,
            category_id: budget.category_id,
            month: budget.month.to_string(),
            limit: budget.limit,
            notify: budget.notify,
        }
    }
}

/// The text stored in `budget.month_start` for `month`, e.g. "2025-09-01".
pub fn month_start_param(month: YearMonth) -> String {
    format!("{month}-01")
}

fn validate_limit(limit: f64) -> Result<f64, Error> {
    if limit.is_finite() && limit > 0.0 {
        Ok(limit)
    } else {
        Err(Error::InvalidAmount)
    }
}

fn validate_category(
    user_id: UserID,
    category_id: Option<CategoryId>,
    connection: &Connection,
) -> Result<(), Error> {
    let Some(category_id) = category_id else {
        return Ok(());
    };

    match get_visible_category(user_id, category_id, connection) {
        Ok(_) => Ok(()),
        Err(Error::NotFound) => Err(Error::InvalidCategory(Some(category_id))),
        Err(error) => Err(error),
    }
}

fn map_duplicate_budget(error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::DuplicateBudget,
        error => error.into(),
    }
}

const COLUMNS: &str = "id, user_id, category_id, month_start, limit_amount, notify";

/// Create a budget for `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the limit is not greater than zero,
/// - [Error::InvalidCategory] if the category is neither the user's own nor shared,
/// - [Error::DuplicateBudget] if the user already has a budget for the same
///   category and month,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_budget(
    user_id: UserID,
    budget: NewBudget,
    connection: &Connection,
) -> Result<Budget, Error> {
    let limit = validate_limit(budget.limit)?;
    validate_category(user_id, budget.category_id, connection)?;

    connection
        .prepare(&format!(
            "INSERT INTO budget (user_id, category_id, month_start, limit_amount, notify, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING {COLUMNS}"
        ))?
        .query_row(
            (
                user_id.as_i64(),
                budget.category_id,
                month_start_param(budget.month),
                limit,
                budget.notify,
                format_timestamp(now_utc()),
            ),
            map_budget_row,
        )
        .map_err(map_duplicate_budget)
}

/// Retrieve one of the user's budgets.
///
/// # Errors
/// Returns [Error::NotFound] if the budget does not exist or belongs to another user.
pub fn get_budget(user_id: UserID, id: BudgetId, connection: &Connection) -> Result<Budget, Error> {
    connection
        .prepare(&format!(
            "SELECT {COLUMNS} FROM budget WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &id), (":user_id", &user_id.as_i64())],
            map_budget_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve the user's budgets, optionally only those for `month`, newest first.
pub fn list_budgets(
    user_id: UserID,
    month: Option<YearMonth>,
    connection: &Connection,
) -> Result<Vec<Budget>, Error> {
    let user_id = user_id.as_i64();

    match month {
        Some(month) => connection
            .prepare(&format!(
                "SELECT {COLUMNS} FROM budget
                 WHERE user_id = :user_id AND month_start = :month_start
                 ORDER BY created_at DESC, id DESC"
            ))?
            .query_map(
                rusqlite::named_params! {
                    ":user_id": user_id,
                    ":month_start": month_start_param(month),
                },
                map_budget_row,
            )?
            .map(|maybe_budget| maybe_budget.map_err(|error| error.into()))
            .collect(),
        None => connection
            .prepare(&format!(
                "SELECT {COLUMNS} FROM budget WHERE user_id = :user_id
                 ORDER BY created_at DESC, id DESC"
            ))?
            .query_map(&[(":user_id", &user_id)], map_budget_row)?
            .map(|maybe_budget| maybe_budget.map_err(|error| error.into()))
            .collect(),
    }
}

/// Apply `changes` to one of the user's budgets.
///
/// # Errors
/// Returns the same errors as [create_budget] for invalid fields, and
/// [Error::NotFound] if the budget does not exist.
pub fn update_budget(
    user_id: UserID,
    id: BudgetId,
    changes: BudgetChanges,
    connection: &Connection,
) -> Result<Budget, Error> {
    let mut budget = get_budget(user_id, id, connection)?;

    if let Some(category_id) = changes.category_id {
        validate_category(user_id, Some(category_id), connection)?;
        budget.category_id = Some(category_id);
    }
    if let Some(month) = changes.month {
        budget.month = month;
    }
    if let Some(limit) = changes.limit {
        budget.limit = validate_limit(limit)?;
    }
    if let Some(notify) = changes.notify {
        budget.notify = notify;
    }

    connection
        .execute(
            "UPDATE budget SET category_id = ?1, month_start = ?2, limit_amount = ?3, notify = ?4
             WHERE id = ?5 AND user_id = ?6",
            (
                budget.category_id,
                month_start_param(budget.month),
                budget.limit,
                budget.notify,
                id,
                user_id.as_i64(),
            ),
        )
        .map_err(map_duplicate_budget)?;

    Ok(budget)
}

/// Delete one of the user's budgets.
///
/// # Errors
/// Returns [Error::NotFound] if the budget does not exist or belongs to another user.
pub fn delete_budget(user_id: UserID, id: BudgetId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM budget WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Create the budget table.
///
/// A user has at most one budget per category and month, and at most one
/// global budget per month.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            category_id INTEGER REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE,
            month_start TEXT NOT NULL,
            limit_amount REAL NOT NULL CHECK (limit_amount > 0),
            notify INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_budget_scope
            ON budget(user_id, IFNULL(category_id, 0), month_start);",
    )?;

    Ok(())
}

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    let month_start: String = row.get(3)?;
    let month = month_start
        .get(..7)
        .and_then(|token| YearMonth::parse(token).ok())
        .ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                format!("invalid month start \"{month_start}\"").into(),
            )
        })?;

    Ok(Budget {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        category_id: row.get(2)?,
        month,
        limit: row.get(4)?,
        notify: row.get(5)?,
    })
}

#[cfg(test)]
mod budget_tests {
    use time::Month;

    use crate::{
        Error,
        budget::{
            BudgetChanges, NewBudget, create_budget, delete_budget, get_budget, list_budgets,
            update_budget,
        },
        category::{CategoryOwner, Kind, create_category, delete_category},
        period::YearMonth,
        test_utils::{
            create_test_user, create_test_user_with_email, get_test_connection,
            new_test_category,
        },
    };

    const SEPTEMBER: YearMonth = YearMonth::new(2025, Month::September);
    const OCTOBER: YearMonth = YearMonth::new(2025, Month::October);

    fn new_budget(category_id: Option<i64>, month: YearMonth, limit: f64) -> NewBudget {
        NewBudget {
            category_id,
            month,
            limit,
            notify: true,
        }
    }

    #[test]
    fn create_and_get_budget() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let budget = create_budget(user.id, new_budget(None, SEPTEMBER, 500.0), &conn).unwrap();

        assert!(budget.id > 0);
        assert_eq!(budget.month, SEPTEMBER);
        assert_eq!(get_budget(user.id, budget.id, &conn), Ok(budget));
    }

    #[test]
    fn create_rejects_non_positive_limit() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let result = create_budget(user.id, new_budget(None, SEPTEMBER, 0.0), &conn);

        assert_eq!(result, Err(Error::InvalidAmount));
    }

    #[test]
    fn create_rejects_other_users_category() {
        let conn = get_test_connection();
        let ada = create_test_user(&conn);
        let bob = create_test_user_with_email("bob@example.com", &conn);
        let category = create_category(
            CategoryOwner::User(ada.id),
            new_test_category("Pets", Kind::Expense),
            &conn,
        )
        .unwrap();

        let result = create_budget(bob.id, new_budget(Some(category.id), SEPTEMBER, 50.0), &conn);

        assert_eq!(result, Err(Error::InvalidCategory(Some(category.id))));
    }

    #[test]
    fn create_rejects_duplicate_scope_and_month() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let category = create_category(
            CategoryOwner::User(user.id),
            new_test_category("Pets", Kind::Expense),
            &conn,
        )
        .unwrap();
        create_budget(user.id, new_budget(Some(category.id), SEPTEMBER, 50.0), &conn).unwrap();
        create_budget(user.id, new_budget(None, SEPTEMBER, 50.0), &conn).unwrap();

        assert_eq!(
            create_budget(user.id, new_budget(Some(category.id), SEPTEMBER, 80.0), &conn),
            Err(Error::DuplicateBudget)
        );
        assert_eq!(
            create_budget(user.id, new_budget(None, SEPTEMBER, 80.0), &conn),
            Err(Error::DuplicateBudget)
        );
        assert!(create_budget(user.id, new_budget(None, OCTOBER, 80.0), &conn).is_ok());
    }

    #[test]
    fn list_filters_by_month_newest_first() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let groceries = create_category(
            CategoryOwner::User(user.id),
            new_test_category("Food", Kind::Expense),
            &conn,
        )
        .unwrap();
        let first = create_budget(user.id, new_budget(None, SEPTEMBER, 10.0), &conn).unwrap();
        let second =
            create_budget(user.id, new_budget(Some(groceries.id), SEPTEMBER, 20.0), &conn)
                .unwrap();
        let third = create_budget(user.id, new_budget(None, OCTOBER, 30.0), &conn).unwrap();

        let all = list_budgets(user.id, None, &conn).unwrap();
        let september = list_budgets(user.id, Some(SEPTEMBER), &conn).unwrap();

        assert_eq!(all, vec![third, second.clone(), first.clone()]);
        assert_eq!(september, vec![second, first]);
    }

    #[test]
    fn update_changes_limit_and_month() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let budget = create_budget(user.id, new_budget(None, SEPTEMBER, 10.0), &conn).unwrap();

        let updated = update_budget(
            user.id,
            budget.id,
            BudgetChanges {
                month: Some(OCTOBER),
                limit: Some(99.5),
                notify: Some(false),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();

        assert_eq!(updated.month, OCTOBER);
        assert_eq!(updated.limit, 99.5);
        assert!(!updated.notify);
        assert_eq!(get_budget(user.id, budget.id, &conn), Ok(updated));
    }

    #[test]
    fn update_into_existing_scope_is_duplicate() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        create_budget(user.id, new_budget(None, SEPTEMBER, 10.0), &conn).unwrap();
        let october = create_budget(user.id, new_budget(None, OCTOBER, 10.0), &conn).unwrap();

        let result = update_budget(
            user.id,
            october.id,
            BudgetChanges {
                month: Some(SEPTEMBER),
                ..Default::default()
            },
            &conn,
        );

        assert_eq!(result, Err(Error::DuplicateBudget));
    }

    #[test]
    fn delete_removes_budget() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let budget = create_budget(user.id, new_budget(None, SEPTEMBER, 10.0), &conn).unwrap();

        delete_budget(user.id, budget.id, &conn).unwrap();

        assert_eq!(get_budget(user.id, budget.id, &conn), Err(Error::NotFound));
        assert_eq!(delete_budget(user.id, budget.id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn deleting_category_deletes_its_budgets() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let category = create_category(
            CategoryOwner::User(user.id),
            new_test_category("Pets", Kind::Expense),
            &conn,
        )
        .unwrap();
        let budget =
            create_budget(user.id, new_budget(Some(category.id), SEPTEMBER, 10.0), &conn)
                .unwrap();

        delete_category(user.id, category.id, &conn).unwrap();

        assert_eq!(get_budget(user.id, budget.id, &conn), Err(Error::NotFound));
    }
}
