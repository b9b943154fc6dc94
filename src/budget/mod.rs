//! Monthly budgets and their JSON endpoints.

mod core;
mod endpoints;

pub use core::{
    Budget, BudgetChanges, BudgetForm, BudgetResponse, BudgetUpdateForm, NewBudget,
    create_budget, create_budget_table, delete_budget, get_budget, list_budgets,
    month_start_param, update_budget,
};
pub use endpoints::{
    create_budget_endpoint, delete_budget_endpoint, get_budget_endpoint, list_budgets_endpoint,
    update_budget_endpoint,
};
