//! Dashboard module
//!
//! A lighter, single month summary of the ledger: totals, the category
//! breakdown, the latest transactions and budget usage.

mod handlers;
mod summary;

pub use handlers::{DashboardQuery, DashboardState, get_dashboard_summary};
pub use summary::{DashboardBudgetUsage, DashboardCategory, DashboardSummary, build_summary};
