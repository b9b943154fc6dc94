//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/budgets/{budget_id}', use [format_endpoint].

/// The route to request a cup of coffee (experimental).
pub const COFFEE: &str = "/api/coffee";
/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to register users.
pub const USERS: &str = "/api/users";
/// The route to get the logged in user.
pub const CURRENT_USER: &str = "/api/users/me";
/// The route for period reports.
pub const REPORTS: &str = "/api/reports";
/// The route for the monthly dashboard summary.
pub const DASHBOARD_SUMMARY: &str = "/api/dashboard/summary";
/// The route to list and create categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route to update or delete a single category.
pub const CATEGORY: &str = "/api/categories/{category_id}";
/// The route to list and create transactions.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to list and create budgets.
pub const BUDGETS: &str = "/api/budgets";
/// The route to access a single budget.
pub const BUDGET: &str = "/api/budgets/{budget_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };
    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
