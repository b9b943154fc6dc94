//! Builds the dashboard summary for one month.

use serde::Serialize;

use crate::{
    Error, UserID,
    category::Kind,
    database_id::{BudgetId, CategoryId},
    ledger::LedgerQueries,
    period::{Interval, YearMonth},
    report::{TxMini, budget_utilization, round2},
};

/// The number of transactions listed in the summary's `recent` section.
pub const DASHBOARD_RECENT_LIMIT: u32 = 10;

/// A category's total for the month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCategory {
    pub category_id: CategoryId,
    pub name: String,
    pub emoji: Option<String>,
    pub color: Option<String>,
    #[serde(rename = "type")]
    pub kind: Kind,
    pub total: f64,
}

/// The spending against one of the month's budgets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardBudgetUsage {
    pub budget_id: BudgetId,
    pub category_id: Option<CategoryId>,
    /// "YYYY-MM"
    pub month: String,
    pub limit: f64,
    pub spent: f64,
    pub usage_pct: f64,
}

/// A summary of one month of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// "YYYY-MM"
    pub month: String,
    pub income_total: f64,
    pub expense_total: f64,
    pub net: f64,
    pub by_category: Vec<DashboardCategory>,
    pub recent: Vec<TxMini>,
    pub budget_usage: Vec<DashboardBudgetUsage>,
}

/// Summarise `owner`'s ledger for `month`.
///
/// Totals and usage percentages are rounded to two decimal places.
///
/// # Errors
/// Returns [Error::AggregationFailed] if any ledger query fails.
pub fn build_summary(
    owner: UserID,
    month: YearMonth,
    ledger: &impl LedgerQueries,
) -> Result<DashboardSummary, Error> {
    let interval = Interval::from_days(month.first_day(), month.last_day());
    tracing::debug!("building dashboard summary for user {owner} in {month}");

    let totals = ledger.sum_by_type(owner, &interval)?;

    let by_category = ledger
        .category_breakdown(owner, &interval)?
        .into_iter()
        .map(|row| DashboardCategory {
            category_id: row.category_id,
            name: row.name,
            emoji: row.icon,
            color: row.color,
            kind: row.kind,
            total: row.total,
        })
        .collect();

    let recent = ledger
        .recent_transactions(owner, &interval, DASHBOARD_RECENT_LIMIT)?
        .into_iter()
        .map(TxMini::from)
        .collect();

    let budget_usage = budget_utilization(owner, month, ledger)?
        .into_iter()
        .map(|utilization| DashboardBudgetUsage {
            budget_id: utilization.budget_id,
            category_id: utilization.category_id,
            month: month.to_string(),
            limit: utilization.limit,
            spent: utilization.spent,
            usage_pct: round2(utilization.usage_pct),
        })
        .collect();

    Ok(DashboardSummary {
        month: month.to_string(),
        income_total: round2(totals.income),
        expense_total: round2(totals.expense),
        net: round2(totals.income - totals.expense),
        by_category,
        recent,
        budget_usage,
    })
}

#[cfg(test)]
mod build_summary_tests {
    use time::{Month, macros::date};

    use crate::{
        budget::{NewBudget, create_budget},
        category::{CategoryOwner, Kind, create_category},
        ledger::SqliteLedger,
        period::YearMonth,
        test_utils::{create_test_user, get_test_connection, new_test_category},
        transaction::{Transaction, create_transaction},
    };

    use super::{DASHBOARD_RECENT_LIMIT, build_summary};

    const SEPTEMBER: YearMonth = YearMonth::new(2025, Month::September);

    #[test]
    fn summarises_month() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let food = create_category(
            CategoryOwner::User(user.id),
            new_test_category("Food", Kind::Expense),
            &conn,
        )
        .unwrap();
        let budget = create_budget(
            user.id,
            NewBudget {
                category_id: Some(food.id),
                month: SEPTEMBER,
                limit: 300.0,
                notify: true,
            },
            &conn,
        )
        .unwrap();
        create_transaction(
            user.id,
            Transaction::build(1000.004, date!(2025 - 09 - 01), "Pay").kind(Some(Kind::Income)),
            &conn,
        )
        .unwrap();
        create_transaction(
            user.id,
            Transaction::build(100.0, date!(2025 - 09 - 02), "Market").category_id(Some(food.id)),
            &conn,
        )
        .unwrap();
        create_transaction(
            user.id,
            Transaction::build(999.0, date!(2025 - 10 - 01), "Next month")
                .category_id(Some(food.id)),
            &conn,
        )
        .unwrap();

        let summary = build_summary(user.id, SEPTEMBER, &SqliteLedger::new(&conn)).unwrap();

        assert_eq!(summary.month, "2025-09");
        assert_eq!(summary.income_total, 1000.0);
        assert_eq!(summary.expense_total, 100.0);
        assert_eq!(summary.net, 900.0);
        assert_eq!(summary.by_category.len(), 1);
        assert_eq!(summary.by_category[0].total, 100.0);
        assert_eq!(summary.recent.len(), 2);
        assert_eq!(summary.recent[0].title, "Market");
        assert_eq!(summary.budget_usage.len(), 1);
        assert_eq!(summary.budget_usage[0].budget_id, budget.id);
        assert_eq!(summary.budget_usage[0].month, "2025-09");
        assert_eq!(summary.budget_usage[0].spent, 100.0);
        assert_eq!(summary.budget_usage[0].usage_pct, 33.33);
    }

    #[test]
    fn recent_is_capped_at_ten() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        for day in 1..=12 {
            create_transaction(
                user.id,
                Transaction::build(1.0, date!(2025 - 09 - 01).replace_day(day).unwrap(), "x")
                    .kind(Some(Kind::Expense)),
                &conn,
            )
            .unwrap();
        }

        let summary = build_summary(user.id, SEPTEMBER, &SqliteLedger::new(&conn)).unwrap();

        assert_eq!(summary.recent.len(), DASHBOARD_RECENT_LIMIT as usize);
        assert_eq!(summary.recent[0].date, "2025-09-12");
    }

    #[test]
    fn empty_month_is_all_zero() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let summary = build_summary(user.id, SEPTEMBER, &SqliteLedger::new(&conn)).unwrap();

        assert_eq!(summary.income_total, 0.0);
        assert_eq!(summary.net, 0.0);
        assert!(summary.by_category.is_empty());
        assert!(summary.recent.is_empty());
        assert!(summary.budget_usage.is_empty());
    }
}
