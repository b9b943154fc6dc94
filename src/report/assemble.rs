//! Builds a full period report from the ledger.

use serde::Serialize;

use crate::{
    Error, ReportConfig, UserID,
    category::Kind,
    database_id::{BudgetId, CategoryId, TransactionId},
    ledger::{CashflowRow, LedgerQueries, TransactionSummary},
    period::{PeriodLabel, PeriodQuery, resolve_period},
    report::{
        aggregation::budget_utilization,
        kpi::{
            BudgetStatus, avg_transaction, budget_status, category_share, net, pct_change, round2,
            savings_rate,
        },
    },
};

/// The number of transactions listed in a report's `recent` section.
pub const REPORT_RECENT_LIMIT: u32 = 20;

/// The essentials of a transaction, as listed in reports and summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxMini {
    pub id: TransactionId,
    pub title: String,
    pub amount: f64,
    pub category_id: Option<CategoryId>,
    /// "YYYY-MM-DD"
    pub date: String,
    #[serde(rename = "type")]
    pub kind: Kind,
}

impl From<TransactionSummary> for TxMini {
    fn from(summary: TransactionSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title,
            amount: summary.amount,
            category_id: summary.category_id,
            date: summary.occurred_at.date().to_string(),
            kind: summary.kind,
        }
    }
}

/// Month-over-month percentage changes. A field is `None` when the previous
/// month's value was zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthOverMonth {
    pub income: Option<f64>,
    pub expense: Option<f64>,
    pub net: Option<f64>,
}

/// The headline numbers of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportKpis {
    pub income_total: f64,
    pub expense_total: f64,
    pub net: f64,
    pub savings_rate: f64,
    pub tx_count: u32,
    pub avg_tx: f64,
    pub largest_expense: Option<TxMini>,
    /// Only present for single month reports.
    pub mom: Option<MonthOverMonth>,
}

/// Income and expenses for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCashflow {
    /// "YYYY-MM-DD"
    pub date: String,
    pub income: f64,
    pub expense: f64,
    pub net: f64,
}

/// Income and expenses for one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCashflow {
    /// "YYYY-MM"
    pub month: String,
    pub income: f64,
    pub expense: f64,
    pub net: f64,
}

/// The daily and monthly cashflow series, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cashflow {
    pub daily: Vec<DailyCashflow>,
    pub monthly: Vec<MonthlyCashflow>,
}

/// The total for one category and its share of categorised expenses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    pub category_id: CategoryId,
    pub name: String,
    pub emoji: Option<String>,
    pub color: Option<String>,
    #[serde(rename = "type")]
    pub kind: Kind,
    pub total: f64,
    pub share_pct: f64,
    /// Not computed yet, always `None`.
    pub mom_pct: Option<f64>,
}

/// The spending against one budget in a single month report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUsage {
    pub budget_id: BudgetId,
    pub category_id: Option<CategoryId>,
    pub limit: f64,
    pub spent: f64,
    pub usage_pct: f64,
    pub status: BudgetStatus,
}

/// The analytics for one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOut {
    pub period: PeriodLabel,
    pub currency: String,
    pub kpis: ReportKpis,
    pub cashflow: Cashflow,
    pub by_category: Vec<CategoryStat>,
    /// Empty for range reports.
    pub budget_usage: Vec<BudgetUsage>,
    pub recent: Vec<TxMini>,
    /// Not detected yet, always empty.
    pub recurring: Vec<serde_json::Value>,
    /// Not detected yet, always empty.
    pub anomalies: Vec<serde_json::Value>,
}

/// Build the report for `owner` over the period selected by `query`.
///
/// Percentages are rounded to two decimal places; amounts are reported as
/// stored. Single month reports also compare against the previous month and
/// include budget usage.
///
/// # Errors
/// Returns [Error::InvalidPeriod] if `query` does not select a valid period,
/// or [Error::AggregationFailed] if any ledger query fails. No partial report
/// is produced.
pub fn get_report(
    owner: UserID,
    query: &PeriodQuery,
    ledger: &impl LedgerQueries,
    config: &ReportConfig,
) -> Result<ReportOut, Error> {
    let period = resolve_period(query)?;
    let interval = period.interval();
    tracing::debug!(
        "building report for user {} from {} to {}",
        owner.as_i64(),
        period.start(),
        period.end()
    );

    let totals = ledger.sum_by_type(owner, &interval)?;
    let tx_count = ledger.count_transactions(owner, &interval)?;
    let net_total = net(totals.income, totals.expense);
    let largest_expense = ledger.largest_expense(owner, &interval)?.map(TxMini::from);

    let mom = match period.comparison() {
        Some(previous) => {
            let previous_totals = ledger.sum_by_type(owner, &previous.interval())?;
            Some(MonthOverMonth {
                income: pct_change(totals.income, previous_totals.income).map(round2),
                expense: pct_change(totals.expense, previous_totals.expense).map(round2),
                net: pct_change(
                    net_total,
                    net(previous_totals.income, previous_totals.expense),
                )
                .map(round2),
            })
        }
        None => None,
    };

    let kpis = ReportKpis {
        income_total: totals.income,
        expense_total: totals.expense,
        net: net_total,
        savings_rate: round2(savings_rate(totals.income, totals.expense)),
        tx_count,
        avg_tx: avg_transaction(totals.income, totals.expense, tx_count),
        largest_expense,
        mom,
    };

    let cashflow = Cashflow {
        daily: ledger
            .daily_series(owner, &interval)?
            .into_iter()
            .map(|CashflowRow { bucket, income, expense }| DailyCashflow {
                date: bucket,
                income,
                expense,
                net: net(income, expense),
            })
            .collect(),
        monthly: ledger
            .monthly_series(owner, &interval)?
            .into_iter()
            .map(|CashflowRow { bucket, income, expense }| MonthlyCashflow {
                month: bucket,
                income,
                expense,
                net: net(income, expense),
            })
            .collect(),
    };

    let breakdown = ledger.category_breakdown(owner, &interval)?;
    let categorised_expense: f64 = breakdown
        .iter()
        .filter(|row| row.kind == Kind::Expense)
        .map(|row| row.total)
        .sum();
    let by_category = breakdown
        .into_iter()
        .map(|row| CategoryStat {
            share_pct: round2(category_share(row.kind, row.total, categorised_expense)),
            category_id: row.category_id,
            name: row.name,
            emoji: row.icon,
            color: row.color,
            kind: row.kind,
            total: row.total,
            mom_pct: None,
        })
        .collect();

    let budget_usage = match period.single_month() {
        Some(month) => budget_utilization(owner, month, ledger)?
            .into_iter()
            .map(|utilization| {
                let usage_pct = round2(utilization.usage_pct);
                BudgetUsage {
                    budget_id: utilization.budget_id,
                    category_id: utilization.category_id,
                    limit: utilization.limit,
                    spent: utilization.spent,
                    usage_pct,
                    status: budget_status(usage_pct),
                }
            })
            .collect(),
        None => Vec::new(),
    };

    let recent = ledger
        .recent_transactions(owner, &interval, REPORT_RECENT_LIMIT)?
        .into_iter()
        .map(TxMini::from)
        .collect();

    Ok(ReportOut {
        period: period.label(),
        currency: config.currency.clone(),
        kpis,
        cashflow,
        by_category,
        budget_usage,
        recent,
        recurring: Vec::new(),
        anomalies: Vec::new(),
    })
}
