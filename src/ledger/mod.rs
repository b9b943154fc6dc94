//! Read-only aggregate queries over a user's transactions and budgets.
//!
//! The reporting code only talks to storage through [LedgerQueries], which is
//! handed to it explicitly. [SqliteLedger] implements it for the application
//! database.
//!
//! Every query is scoped to one owner and ignores soft deleted transactions.
//! Implementations report storage failures as [crate::Error::AggregationFailed].

mod sqlite;

use time::OffsetDateTime;

use crate::{
    Error, UserID,
    category::Kind,
    database_id::{BudgetId, CategoryId, TransactionId},
    period::{Interval, YearMonth},
};

pub use sqlite::SqliteLedger;

/// Income and expense totals. Both are zero when there is nothing to sum.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TypeTotals {
    /// The sum of income transactions.
    pub income: f64,
    /// The sum of expense transactions.
    pub expense: f64,
}

/// Income and expense totals for one day ("YYYY-MM-DD") or month ("YYYY-MM").
#[derive(Debug, Clone, PartialEq)]
pub struct CashflowRow {
    /// The day or month the totals are for.
    pub bucket: String,
    /// The sum of income transactions in the bucket.
    pub income: f64,
    /// The sum of expense transactions in the bucket.
    pub expense: f64,
}

/// The sum of a category's transactions, with the category's display details.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotalRow {
    pub category_id: CategoryId,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    /// The category's current kind.
    pub kind: Kind,
    pub total: f64,
}

/// A budget's scope and limit.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetRow {
    pub budget_id: BudgetId,
    /// `None` for a global budget.
    pub category_id: Option<CategoryId>,
    pub limit_amount: f64,
}

/// The fields of a transaction shown in reports.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionSummary {
    pub id: TransactionId,
    pub title: String,
    pub amount: f64,
    pub category_id: Option<CategoryId>,
    pub occurred_at: OffsetDateTime,
    pub kind: Kind,
}

/// The storage capabilities that reports are built from.
///
/// Each method is one query; none of them are expected to see the same
/// snapshot of the data.
pub trait LedgerQueries {
    /// Total income and expenses in `interval`.
    fn sum_by_type(&self, owner: UserID, interval: &Interval) -> Result<TypeTotals, Error>;

    /// The number of transactions in `interval`.
    fn count_transactions(&self, owner: UserID, interval: &Interval) -> Result<u32, Error>;

    /// Daily totals for each day in `interval` with at least one transaction, oldest first.
    fn daily_series(&self, owner: UserID, interval: &Interval) -> Result<Vec<CashflowRow>, Error>;

    /// Monthly totals for each month in `interval` with at least one
    /// transaction, oldest first.
    fn monthly_series(&self, owner: UserID, interval: &Interval)
    -> Result<Vec<CashflowRow>, Error>;

    /// Totals for each category with at least one transaction in `interval`,
    /// largest first with ties broken by category ID. Uncategorised
    /// transactions are left out.
    fn category_breakdown(
        &self,
        owner: UserID,
        interval: &Interval,
    ) -> Result<Vec<CategoryTotalRow>, Error>;

    /// The owner's budgets for `month`, ordered by ID.
    fn budgets_for_month(&self, owner: UserID, month: YearMonth) -> Result<Vec<BudgetRow>, Error>;

    /// The expenses in `month` whose category is `category_id`.
    ///
    /// `None` matches only expenses without a category; it is not the total
    /// across all categories.
    fn spent_for_budget_scope(
        &self,
        owner: UserID,
        category_id: Option<CategoryId>,
        month: YearMonth,
    ) -> Result<f64, Error>;

    /// The expense with the highest amount in `interval`, the lowest ID winning ties.
    fn largest_expense(
        &self,
        owner: UserID,
        interval: &Interval,
    ) -> Result<Option<TransactionSummary>, Error>;

    /// Up to `limit` transactions in `interval`, most recent first, then by
    /// ID descending.
    fn recent_transactions(
        &self,
        owner: UserID,
        interval: &Interval,
        limit: u32,
    ) -> Result<Vec<TransactionSummary>, Error>;
}
