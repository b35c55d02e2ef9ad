//! Read-side reporting composed over the ledger facades. Nothing here
//! mutates the store.

use crate::config::today;
use crate::db::Db;
use crate::domain::{Account, BalanceSummary, month_bounds};
use crate::error::{LedgerError, LedgerResult};
use crate::export::render_table;
use crate::ledger;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Which series a monthly trend reports. Anything that is not income or
/// expense reads as net change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendKind {
    Income,
    Expense,
    Net,
}

impl FromStr for TrendKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "INCOME" => TrendKind::Income,
            "EXPENSE" => TrendKind::Expense,
            _ => TrendKind::Net,
        })
    }
}

/// Totals for the last `months` calendar months ending at the current one,
/// keyed by a human month label, oldest first. Months with no activity
/// report zero.
pub fn monthly_trend(db: &Db, months: u32, kind: TrendKind) -> LedgerResult<Vec<(String, Decimal)>> {
    if months == 0 {
        return Err(LedgerError::validation("Months must be greater than zero"));
    }

    let now = today();
    let mut trend = Vec::with_capacity(months as usize);

    for back in (0..months).rev() {
        let (year, month) = month_minus(now.year(), now.month(), back);
        let (first, last) = month_bounds(year, month)
            .ok_or_else(|| LedgerError::validation(format!("Invalid month: {year}-{month:02}")))?;

        let amount = match kind {
            TrendKind::Income => ledger::total_income(db, first, last)?,
            TrendKind::Expense => ledger::total_expenses(db, first, last)?,
            TrendKind::Net => ledger::net_change(db, first, last)?,
        };

        trend.push((first.format("%b %Y").to_string(), amount));
    }

    Ok(trend)
}

/// Largest expense categories, descending by total, truncated to `limit`.
/// Ties keep the first-seen order of the underlying aggregation.
pub fn top_spending_categories(db: &Db, limit: usize) -> LedgerResult<Vec<(String, Decimal)>> {
    let mut spending = ledger::spending_by_category(db)?;
    spending.sort_by(|a, b| b.1.cmp(&a.1));
    spending.truncate(limit);
    Ok(spending)
}

fn month_minus(year: i32, month: u32, back: u32) -> (i32, u32) {
    let total = year * 12 + month as i32 - 1 - back as i32;
    (total.div_euclid(12), (total.rem_euclid(12) + 1) as u32)
}

// ---------------------------------------------------------------------------
// Rendering

pub fn render_category_report(data: &[(String, Decimal)], title: &str) -> String {
    if data.is_empty() {
        return "No data available for the report.".to_string();
    }

    let mut sorted: Vec<_> = data.to_vec();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));

    let mut total = Decimal::ZERO;
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(sorted.len() + 1);
    for (name, amount) in &sorted {
        total += *amount;
        rows.push(vec![name.clone(), format_amount(*amount)]);
    }
    rows.push(vec!["TOTAL".to_string(), format_amount(total)]);

    format!("{title}\n{}", render_table(&["Category", "Amount"], &rows))
}

pub fn render_trend(trend: &[(String, Decimal)], title: &str) -> String {
    let rows: Vec<Vec<String>> = trend
        .iter()
        .map(|(label, amount)| vec![label.clone(), format_amount(*amount)])
        .collect();
    format!("{title}\n{}", render_table(&["Month", "Amount"], &rows))
}

pub fn render_account_summary(
    account: &Account,
    summary: &BalanceSummary,
    from: NaiveDate,
    to: NaiveDate,
) -> String {
    let rows = vec![
        vec!["Total Income".to_string(), format_amount(summary.total_income)],
        vec!["Total Expenses".to_string(), format_amount(summary.total_expenses)],
        vec!["Net Change".to_string(), format_amount(summary.net_change)],
    ];
    format!(
        "ACCOUNT SUMMARY: {}\nPeriod: {from} to {to}\n\n{}",
        account.name,
        render_table(&["Metric", "Amount"], &rows)
    )
}

fn format_amount(amount: Decimal) -> String {
    format!("${}", amount.round_dp(2))
}
