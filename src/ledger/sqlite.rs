//! [LedgerQueries] over the application's SQLite database.

use rusqlite::{Connection, OptionalExtension, Row, named_params};

use crate::{
    Error, UserID,
    budget::month_start_param,
    database_id::CategoryId,
    ledger::{
        BudgetRow, CashflowRow, CategoryTotalRow, LedgerQueries, TransactionSummary, TypeTotals,
    },
    period::{Interval, YearMonth},
    timestamp::get_timestamp,
};

/// The filter shared by every transaction query: one owner, no deleted rows,
/// inside the interval.
const LIVE_IN_INTERVAL: &str = "t.user_id = :user_id
    AND t.deleted_at IS NULL
    AND t.occurred_at BETWEEN :start AND :end";

const SUM_INCOME: &str = "IFNULL(SUM(CASE WHEN t.kind = 'income' THEN t.amount END), 0.0)";
const SUM_EXPENSE: &str = "IFNULL(SUM(CASE WHEN t.kind = 'expense' THEN t.amount END), 0.0)";

/// Runs ledger queries on a borrowed SQLite connection.
#[derive(Debug, Clone, Copy)]
pub struct SqliteLedger<'a> {
    connection: &'a Connection,
}

impl<'a> SqliteLedger<'a> {
    /// Create a ledger that queries `connection`.
    pub fn new(connection: &'a Connection) -> Self {
        Self { connection }
    }

    fn cashflow_series(
        &self,
        query_name: &'static str,
        bucket: &str,
        owner: UserID,
        interval: &Interval,
    ) -> Result<Vec<CashflowRow>, Error> {
        let query = format!(
            "SELECT {bucket} AS bucket, {SUM_INCOME}, {SUM_EXPENSE}
             FROM \"transaction\" t
             WHERE {LIVE_IN_INTERVAL}
             GROUP BY bucket
             ORDER BY bucket ASC"
        );

        let run = || -> Result<Vec<CashflowRow>, rusqlite::Error> {
            self.connection
                .prepare(&query)?
                .query_map(
                    named_params! {
                        ":user_id": owner.as_i64(),
                        ":start": interval.start_param(),
                        ":end": interval.end_param(),
                    },
                    |row| {
                        Ok(CashflowRow {
                            bucket: row.get(0)?,
                            income: row.get(1)?,
                            expense: row.get(2)?,
                        })
                    },
                )?
                .collect()
        };

        run().map_err(|error| aggregation_failed(query_name, error))
    }
}

/// Log the failed query and convert the error for the caller.
fn aggregation_failed(query_name: &str, error: rusqlite::Error) -> Error {
    tracing::error!("ledger query {query_name} failed: {error}");
    Error::AggregationFailed(format!("{query_name}: {error}"))
}

fn map_summary_row(row: &Row) -> Result<TransactionSummary, rusqlite::Error> {
    Ok(TransactionSummary {
        id: row.get(0)?,
        title: row.get(1)?,
        amount: row.get(2)?,
        category_id: row.get(3)?,
        occurred_at: get_timestamp(row, 4)?,
        kind: row.get(5)?,
    })
}

impl LedgerQueries for SqliteLedger<'_> {
    fn sum_by_type(&self, owner: UserID, interval: &Interval) -> Result<TypeTotals, Error> {
        self.connection
            .query_row(
                &format!(
                    "SELECT {SUM_INCOME}, {SUM_EXPENSE}
                     FROM \"transaction\" t
                     WHERE {LIVE_IN_INTERVAL}"
                ),
                named_params! {
                    ":user_id": owner.as_i64(),
                    ":start": interval.start_param(),
                    ":end": interval.end_param(),
                },
                |row| {
                    Ok(TypeTotals {
                        income: row.get(0)?,
                        expense: row.get(1)?,
                    })
                },
            )
            .map_err(|error| aggregation_failed("sum_by_type", error))
    }

    fn count_transactions(&self, owner: UserID, interval: &Interval) -> Result<u32, Error> {
        self.connection
            .query_row(
                &format!("SELECT COUNT(t.id) FROM \"transaction\" t WHERE {LIVE_IN_INTERVAL}"),
                named_params! {
                    ":user_id": owner.as_i64(),
                    ":start": interval.start_param(),
                    ":end": interval.end_param(),
                },
                |row| row.get(0),
            )
            .map_err(|error| aggregation_failed("count_transactions", error))
    }

    fn daily_series(&self, owner: UserID, interval: &Interval) -> Result<Vec<CashflowRow>, Error> {
        self.cashflow_series("daily_series", "date(t.occurred_at)", owner, interval)
    }

    fn monthly_series(
        &self,
        owner: UserID,
        interval: &Interval,
    ) -> Result<Vec<CashflowRow>, Error> {
        self.cashflow_series(
            "monthly_series",
            "strftime('%Y-%m', t.occurred_at)",
            owner,
            interval,
        )
    }

    fn category_breakdown(
        &self,
        owner: UserID,
        interval: &Interval,
    ) -> Result<Vec<CategoryTotalRow>, Error> {
        let query = format!(
            "SELECT c.id, c.name, c.icon, c.color_hex, c.kind, SUM(t.amount) AS total
             FROM \"transaction\" t
             INNER JOIN category c ON c.id = t.category_id
             WHERE {LIVE_IN_INTERVAL}
             GROUP BY c.id
             ORDER BY total DESC, c.id ASC"
        );

        let run = || -> Result<Vec<CategoryTotalRow>, rusqlite::Error> {
            self.connection
                .prepare(&query)?
                .query_map(
                    named_params! {
                        ":user_id": owner.as_i64(),
                        ":start": interval.start_param(),
                        ":end": interval.end_param(),
                    },
                    |row| {
                        Ok(CategoryTotalRow {
                            category_id: row.get(0)?,
                            name: row.get(1)?,
                            icon: row.get(2)?,
                            color: row.get(3)?,
                            kind: row.get(4)?,
                            total: row.get(5)?,
                        })
                    },
                )?
                .collect()
        };

        run().map_err(|error| aggregation_failed("category_breakdown", error))
    }

    fn budgets_for_month(&self, owner: UserID, month: YearMonth) -> Result<Vec<BudgetRow>, Error> {
        let run = || -> Result<Vec<BudgetRow>, rusqlite::Error> {
            self.connection
                .prepare(
                    "SELECT id, category_id, limit_amount FROM budget
                     WHERE user_id = :user_id AND month_start = :month_start
                     ORDER BY id ASC",
                )?
                .query_map(
                    named_params! {
                        ":user_id": owner.as_i64(),
                        ":month_start": month_start_param(month),
                    },
                    |row| {
                        Ok(BudgetRow {
                            budget_id: row.get(0)?,
                            category_id: row.get(1)?,
                            limit_amount: row.get(2)?,
                        })
                    },
                )?
                .collect()
        };

        run().map_err(|error| aggregation_failed("budgets_for_month", error))
    }

    fn spent_for_budget_scope(
        &self,
        owner: UserID,
        category_id: Option<CategoryId>,
        month: YearMonth,
    ) -> Result<f64, Error> {
        let interval = Interval::from_days(month.first_day(), month.last_day());

        // `IS` compares NULL equal to NULL, so a global budget only sees
        // uncategorised expenses.
        self.connection
            .query_row(
                &format!(
                    "SELECT IFNULL(SUM(t.amount), 0.0)
                     FROM \"transaction\" t
                     WHERE {LIVE_IN_INTERVAL}
                        AND t.kind = 'expense'
                        AND t.category_id IS :category_id"
                ),
                named_params! {
                    ":user_id": owner.as_i64(),
                    ":start": interval.start_param(),
                    ":end": interval.end_param(),
                    ":category_id": category_id,
                },
                |row| row.get(0),
            )
            .map_err(|error| aggregation_failed("spent_for_budget_scope", error))
    }

    fn largest_expense(
        &self,
        owner: UserID,
        interval: &Interval,
    ) -> Result<Option<TransactionSummary>, Error> {
        self.connection
            .query_row(
                &format!(
                    "SELECT t.id, t.title, t.amount, t.category_id, t.occurred_at, t.kind
                     FROM \"transaction\" t
                     WHERE {LIVE_IN_INTERVAL} AND t.kind = 'expense'
                     ORDER BY t.amount DESC, t.id ASC
                     LIMIT 1"
                ),
                named_params! {
                    ":user_id": owner.as_i64(),
                    ":start": interval.start_param(),
                    ":end": interval.end_param(),
                },
                map_summary_row,
            )
            .optional()
            .map_err(|error| aggregation_failed("largest_expense", error))
    }

    fn recent_transactions(
        &self,
        owner: UserID,
        interval: &Interval,
        limit: u32,
    ) -> Result<Vec<TransactionSummary>, Error> {
        let query = format!(
            "SELECT t.id, t.title, t.amount, t.category_id, t.occurred_at, t.kind
             FROM \"transaction\" t
             WHERE {LIVE_IN_INTERVAL}
             ORDER BY t.occurred_at DESC, t.id DESC
             LIMIT :limit"
        );

        let run = || -> Result<Vec<TransactionSummary>, rusqlite::Error> {
            self.connection
                .prepare(&query)?
                .query_map(
                    named_params! {
                        ":user_id": owner.as_i64(),
                        ":start": interval.start_param(),
                        ":end": interval.end_param(),
                        ":limit": limit,
                    },
                    map_summary_row,
                )?
                .collect()
        };

        run().map_err(|error| aggregation_failed("recent_transactions", error))
    }
}
