use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationType {
    Income,
    Expense,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationType::Income => write!(f, "INCOME"),
            OperationType::Expense => write!(f, "EXPENSE"),
        }
    }
}

impl FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Ok(OperationType::Income),
            "EXPENSE" => Ok(OperationType::Expense),
            other => Err(format!("Unknown operation type: '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub balance: Decimal,
    /// Extended attributes, present only on accounts created with credentials.
    pub password_hash: Option<String>,
    pub phone_number: Option<String>,
    pub card_number: Option<String>,
}

impl Account {
    pub fn has_sufficient_funds(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }

    pub fn summary_line(&self) -> String {
        format!("Account: {} | Balance: {}", self.name, self.balance.round_dp(2))
    }

    pub fn detailed(&self) -> String {
        let mut out = format!(
            "ID: {}\nName: {}\nBalance: {}",
            self.id,
            self.name,
            self.balance.round_dp(2)
        );
        if let Some(phone) = &self.phone_number {
            out.push_str(&format!("\nPhone: {phone}"));
        }
        if let Some(card) = &self.card_number {
            out.push_str(&format!("\nCard: {}", mask_card(card)));
        }
        out
    }
}

/// Redacts all but the last four digits of a card number.
pub fn mask_card(card: &str) -> String {
    let digits: Vec<char> = card.chars().collect();
    if digits.len() <= 4 {
        return card.to_string();
    }
    let tail: String = digits[digits.len() - 4..].iter().collect();
    format!("**** **** **** {tail}")
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub op_type: OperationType,
}

impl Category {
    pub fn summary_line(&self) -> String {
        format!("Category: {} ({})", self.name, self.op_type)
    }

    pub fn detailed(&self) -> String {
        format!("ID: {}\nName: {}\nType: {}", self.id, self.name, self.op_type)
    }
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub id: Uuid,
    pub op_type: OperationType,
    pub account_id: Uuid,
    pub amount: Decimal,
    pub date: NaiveDateTime,
    pub description: Option<String>,
    pub category_id: Uuid,
}

impl Operation {
    pub fn is_income(&self) -> bool {
        self.op_type == OperationType::Income
    }

    /// Amount with sign convention: + for income, - for expense.
    pub fn signed_amount(&self) -> Decimal {
        match self.op_type {
            OperationType::Income => self.amount,
            OperationType::Expense => -self.amount,
        }
    }
}

/// Summary of an account's activity over a date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSummary {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net_change: Decimal,
}

#[derive(Debug, Clone)]
pub struct CategorySummary {
    pub category: Category,
    pub amount: Decimal,
}

/// Operation enriched with resolved display names for its references.
#[derive(Debug, Clone)]
pub struct OperationDetails {
    pub operation: Operation,
    pub account_name: String,
    pub category_name: String,
}

/// Storage and export format for timestamps. Zero-padded so that the
/// lexicographic order of encoded values matches chronological order.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Table-export timestamp format.
pub const TABLE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT) {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, TABLE_DATETIME_FORMAT) {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(|d| d.and_time(NaiveTime::MIN))
}

/// Inclusive day range [from 00:00:00, to 23:59:59.999999999].
pub fn day_range(from: NaiveDate, to: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = from.and_time(NaiveTime::MIN);
    let end = to.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::nanoseconds(1);
    (start, end)
}

/// First and last day of a calendar month, or None for an invalid month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next_first.pred_opt()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal")
    }

    #[test]
    fn signed_amount_follows_type() {
        let base = Operation {
            id: Uuid::new_v4(),
            op_type: OperationType::Income,
            account_id: Uuid::new_v4(),
            amount: dec("50"),
            date: parse_datetime("2024-03-01T10:00:00").expect("date"),
            description: None,
            category_id: Uuid::new_v4(),
        };
        assert_eq!(base.signed_amount(), dec("50"));

        let expense = Operation {
            op_type: OperationType::Expense,
            ..base
        };
        assert_eq!(expense.signed_amount(), dec("-50"));
    }

    #[test]
    fn operation_type_parses_case_insensitively() {
        assert_eq!("income".parse::<OperationType>(), Ok(OperationType::Income));
        assert_eq!("EXPENSE".parse::<OperationType>(), Ok(OperationType::Expense));
        assert!("transfer".parse::<OperationType>().is_err());
    }

    #[test]
    fn day_range_covers_the_whole_last_day() {
        let from = NaiveDate::from_ymd_opt(2024, 3, 1).expect("date");
        let to = NaiveDate::from_ymd_opt(2024, 3, 2).expect("date");
        let (start, end) = day_range(from, to);

        assert_eq!(format_datetime(start), "2024-03-01T00:00:00");
        assert_eq!(format_datetime(end), "2024-03-02T23:59:59.999999999");
    }

    #[test]
    fn datetime_roundtrip_and_fallback_formats() {
        let dt = parse_datetime("2024-03-01T10:30:00").expect("iso");
        assert_eq!(parse_datetime(&format_datetime(dt)), Some(dt));

        assert_eq!(parse_datetime("2024-03-01 10:30:00"), Some(dt));
        assert_eq!(
            parse_datetime("2024-03-01").map(|d| format_datetime(d)),
            Some("2024-03-01T00:00:00".to_string())
        );
        assert_eq!(parse_datetime("yesterday"), None);
    }

    #[test]
    fn card_masking_keeps_last_four() {
        assert_eq!(mask_card("4539148803436467"), "**** **** **** 6467");
        assert_eq!(mask_card("1234"), "1234");
    }
}
