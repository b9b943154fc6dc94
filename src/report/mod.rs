//! Month-over-month analytics built from the transaction ledger.
//!
//! A report resolves the requested period, queries the ledger through
//! [crate::ledger::LedgerQueries], derives the KPIs and trends, and assembles
//! the result.

mod aggregation;
mod assemble;
mod endpoints;
mod kpi;

pub use aggregation::{BudgetUtilization, budget_utilization};
pub use assemble::{
    BudgetUsage, Cashflow, CategoryStat, DailyCashflow, MonthOverMonth, MonthlyCashflow,
    REPORT_RECENT_LIMIT, ReportKpis, ReportOut, TxMini, get_report,
};
pub use endpoints::{ReportState, get_report_endpoint};
pub use kpi::{BudgetStatus, round2};
