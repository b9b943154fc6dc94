//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use crate::{
    AppState, Error,
    auth::{auth_guard, get_current_user, post_log_in, post_log_out, register_user},
    budget::{
        create_budget_endpoint, delete_budget_endpoint, get_budget_endpoint,
        list_budgets_endpoint, update_budget_endpoint,
    },
    category::{
        create_category_endpoint, delete_category_endpoint, list_categories_endpoint,
        update_category_endpoint,
    },
    dashboard::get_dashboard_summary,
    endpoints,
    report::get_report_endpoint,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_transaction_endpoint,
        list_transactions_endpoint, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::COFFEE, get(get_coffee))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, post(post_log_out))
        .route(endpoints::USERS, post(register_user));

    let protected_routes = Router::new()
        .route(endpoints::CURRENT_USER, get(get_current_user))
        .route(endpoints::REPORTS, get(get_report_endpoint))
        .route(endpoints::DASHBOARD_SUMMARY, get(get_dashboard_summary))
        .route(
            endpoints::CATEGORIES,
            get(list_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            axum::routing::patch(update_category_endpoint).delete(delete_category_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS_API,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .patch(update_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::BUDGETS,
            get(list_budgets_endpoint).post(create_budget_endpoint),
        )
        .route(
            endpoints::BUDGET,
            get(get_budget_endpoint)
                .patch(update_budget_endpoint)
                .delete(delete_budget_endpoint),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    (
        StatusCode::IM_A_TEAPOT,
        Json(json!({ "error": "I'm a teapot" })),
    )
        .into_response()
}

async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}
