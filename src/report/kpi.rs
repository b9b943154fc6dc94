//! Secondary metrics derived from the raw ledger aggregates.
//!
//! Everything here is a pure function. None of them fail: divisions by zero
//! produce `0` or `None` as documented on each function.

use serde::Serialize;

use crate::category::Kind;

/// Round `value` to two decimal places, halves away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Income minus expenses.
pub fn net(income: f64, expense: f64) -> f64 {
    income - expense
}

/// The share of income that was not spent, as a percentage. `0` without income.
pub fn savings_rate(income: f64, expense: f64) -> f64 {
    if income > 0.0 {
        net(income, expense) / income * 100.0
    } else {
        0.0
    }
}

/// The mean absolute amount of the `count` transactions. `0` when there are none.
pub fn avg_transaction(income: f64, expense: f64, count: u32) -> f64 {
    if count > 0 {
        (income + expense) / f64::from(count)
    } else {
        0.0
    }
}

/// A category's share of all categorised expenses, as a percentage.
///
/// Income categories always have a share of `0`, as does everything when
/// `expense_total` is zero.
pub fn category_share(kind: Kind, total: f64, expense_total: f64) -> f64 {
    match kind {
        Kind::Expense if expense_total > 0.0 => total / expense_total * 100.0,
        _ => 0.0,
    }
}

/// The percentage change from `previous` to `current`.
///
/// Returns `None` when `previous` is zero, since the change is undefined.
pub fn pct_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        None
    } else {
        Some((current - previous) / previous.abs() * 100.0)
    }
}

/// How much of a budget's limit has been spent, as a percentage. `0` for a
/// non-positive limit.
pub fn usage_pct(spent: f64, limit: f64) -> f64 {
    if limit > 0.0 { spent / limit * 100.0 } else { 0.0 }
}

/// Whether a budget has room left, has been used up exactly, or has been overspent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    /// Usage is under 100%.
    Ok,
    /// Usage is exactly 100%.
    Hit,
    /// Usage is over 100%.
    Over,
}

/// Classify a budget by its rounded usage percentage.
pub fn budget_status(rounded_usage_pct: f64) -> BudgetStatus {
    if rounded_usage_pct > 100.0 {
        BudgetStatus::Over
    } else if rounded_usage_pct == 100.0 {
        BudgetStatus::Hit
    } else {
        BudgetStatus::Ok
    }
}
