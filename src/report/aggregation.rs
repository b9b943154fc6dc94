//! Budget utilisation, the one aggregate that correlates two ledger queries.

use crate::{
    Error, UserID,
    database_id::{BudgetId, CategoryId},
    ledger::LedgerQueries,
    period::YearMonth,
    report::kpi::usage_pct,
};

/// How much of one budget has been spent.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetUtilization {
    pub budget_id: BudgetId,
    /// `None` for a global budget.
    pub category_id: Option<CategoryId>,
    pub limit: f64,
    pub spent: f64,
    /// The unrounded usage percentage.
    pub usage_pct: f64,
}

/// Compute the spending against each of the owner's budgets for `month`,
/// ordered by budget ID.
///
/// A budget's spending is the owner's expenses in `month` with the same
/// category as the budget, so a global budget only counts uncategorised
/// expenses.
///
/// # Errors
/// Returns [Error::AggregationFailed] if any ledger query fails.
pub fn budget_utilization(
    owner: UserID,
    month: YearMonth,
    ledger: &impl LedgerQueries,
) -> Result<Vec<BudgetUtilization>, Error> {
    ledger
        .budgets_for_month(owner, month)?
        .into_iter()
        .map(|budget| {
            let spent = ledger.spent_for_budget_scope(owner, budget.category_id, month)?;

            Ok(BudgetUtilization {
                budget_id: budget.budget_id,
                category_id: budget.category_id,
                limit: budget.limit_amount,
                spent,
                usage_pct: usage_pct(spent, budget.limit_amount),
            })
        })
        .collect()
}

#[cfg(test)]
mod budget_utilization_tests {
    use time::{Month, macros::date};

    use crate::{
        budget::{NewBudget, create_budget},
        category::{CategoryOwner, Kind, create_category},
        ledger::SqliteLedger,
        period::YearMonth,
        test_utils::{create_test_user, get_test_connection, new_test_category},
        transaction::{Transaction, create_transaction},
    };

    use super::{BudgetUtilization, budget_utilization};

    const SEPTEMBER: YearMonth = YearMonth::new(2025, Month::September);

    #[test]
    fn correlates_budgets_with_their_scope() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let food = create_category(
            CategoryOwner::User(user.id),
            new_test_category("Food", Kind::Expense),
            &conn,
        )
        .unwrap();
        let food_budget = create_budget(
            user.id,
            NewBudget {
                category_id: Some(food.id),
                month: SEPTEMBER,
                limit: 200.0,
                notify: true,
            },
            &conn,
        )
        .unwrap();
        let global_budget = create_budget(
            user.id,
            NewBudget {
                category_id: None,
                month: SEPTEMBER,
                limit: 40.0,
                notify: false,
            },
            &conn,
        )
        .unwrap();
        create_transaction(
            user.id,
            Transaction::build(50.0, date!(2025 - 09 - 03), "Market").category_id(Some(food.id)),
            &conn,
        )
        .unwrap();
        create_transaction(
            user.id,
            Transaction::build(10.0, date!(2025 - 09 - 04), "Cash").kind(Some(Kind::Expense)),
            &conn,
        )
        .unwrap();

        let got = budget_utilization(user.id, SEPTEMBER, &SqliteLedger::new(&conn)).unwrap();

        assert_eq!(
            got,
            vec![
                BudgetUtilization {
                    budget_id: food_budget.id,
                    category_id: Some(food.id),
                    limit: 200.0,
                    spent: 50.0,
                    usage_pct: 25.0,
                },
                BudgetUtilization {
                    budget_id: global_budget.id,
                    category_id: None,
                    limit: 40.0,
                    spent: 10.0,
                    usage_pct: 25.0,
                },
            ]
        );
    }

    #[test]
    fn no_budgets_gives_empty_table() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let got = budget_utilization(user.id, SEPTEMBER, &SqliteLedger::new(&conn)).unwrap();

        assert!(got.is_empty());
    }
}
