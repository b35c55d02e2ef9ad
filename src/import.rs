//! Import from the JSON and bordered-table export formats.
//!
//! Rows are re-created through the same validating facades used everywhere
//! else, so referential and validation rules re-apply. A row that fails is
//! logged and skipped; the import as a whole still succeeds with counts.
//! Operation rows are wired to real entities by resolving the account and
//! category *names* carried in the payload; a row whose names do not resolve
//! fails individually.

use crate::db::{self, Db};
use crate::domain::{parse_datetime, OperationType};
use crate::ledger;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub accounts: usize,
    pub categories: usize,
    pub operations: usize,
    pub skipped: usize,
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Imported {} accounts, {} categories, {} operations ({} rows skipped)",
            self.accounts, self.categories, self.operations, self.skipped
        )
    }
}

/// Candidate rows parsed from either format, not yet validated or persisted.
#[derive(Debug, Default)]
struct ImportData {
    accounts: Vec<AccountRow>,
    categories: Vec<CategoryRow>,
    operations: Vec<OperationRow>,
    /// Rows that could not even be parsed into a candidate.
    malformed: usize,
}

#[derive(Debug)]
struct AccountRow {
    name: String,
    balance: Decimal,
}

#[derive(Debug)]
struct CategoryRow {
    name: String,
    op_type: OperationType,
}

#[derive(Debug)]
struct OperationRow {
    op_type: OperationType,
    account_name: String,
    category_name: String,
    amount: Decimal,
    date: NaiveDateTime,
    description: Option<String>,
}

pub fn import_json(db: &mut Db, input: &str) -> Result<ImportReport> {
    let data = parse_json(input)?;
    apply(db, data)
}

pub fn import_table(db: &mut Db, input: &str) -> Result<ImportReport> {
    let data = parse_table(input);
    apply(db, data)
}

// ---------------------------------------------------------------------------
// JSON parsing

#[derive(Deserialize)]
struct JsonDocument {
    #[serde(default)]
    accounts: Vec<serde_json::Value>,
    #[serde(default)]
    categories: Vec<serde_json::Value>,
    #[serde(default)]
    operations: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct JsonAccount {
    name: String,
    balance: Decimal,
}

#[derive(Deserialize)]
struct JsonCategory {
    name: String,
    #[serde(rename = "type")]
    op_type: String,
}

#[derive(Deserialize)]
struct JsonOperation {
    #[serde(rename = "type")]
    op_type: String,
    amount: Decimal,
    date: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "accountName", default)]
    account_name: Option<String>,
    #[serde(rename = "categoryName", default)]
    category_name: Option<String>,
}

fn parse_json(input: &str) -> Result<ImportData> {
    let doc: JsonDocument =
        serde_json::from_str(input).context("invalid JSON import document")?;
    let mut data = ImportData::default();

    for value in doc.accounts {
        match serde_json::from_value::<JsonAccount>(value) {
            Ok(row) => data.accounts.push(AccountRow {
                name: row.name,
                balance: row.balance,
            }),
            Err(err) => data.reject("account", &err.to_string()),
        }
    }

    for value in doc.categories {
        match serde_json::from_value::<JsonCategory>(value) {
            Ok(row) => match row.op_type.parse::<OperationType>() {
                Ok(op_type) => data.categories.push(CategoryRow {
                    name: row.name,
                    op_type,
                }),
                Err(err) => data.reject("category", &err),
            },
            Err(err) => data.reject("category", &err.to_string()),
        }
    }

    for value in doc.operations {
        let row = match serde_json::from_value::<JsonOperation>(value) {
            Ok(row) => row,
            Err(err) => {
                data.reject("operation", &err.to_string());
                continue;
            }
        };
        let op_type = match row.op_type.parse::<OperationType>() {
            Ok(op_type) => op_type,
            Err(err) => {
                data.reject("operation", &err);
                continue;
            }
        };
        let Some(date) = parse_datetime(&row.date) else {
            data.reject("operation", &format!("unparseable date '{}'", row.date));
            continue;
        };
        data.operations.push(OperationRow {
            op_type,
            account_name: row.account_name.unwrap_or_default(),
            category_name: row.category_name.unwrap_or_default(),
            amount: row.amount,
            date,
            description: row.description,
        });
    }

    Ok(data)
}

// ---------------------------------------------------------------------------
// Table parsing

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Accounts,
    Categories,
    Operations,
}

fn parse_table(input: &str) -> ImportData {
    let mut data = ImportData::default();
    let mut section = Section::None;
    let mut headers: Vec<String> = Vec::new();

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(marker) = line.strip_prefix("==") {
            section = match marker.trim_end_matches('=').trim() {
                "ACCOUNTS" => Section::Accounts,
                "CATEGORIES" => Section::Categories,
                "OPERATIONS" => Section::Operations,
                _ => Section::None,
            };
            headers.clear();
            continue;
        }
        if section == Section::None || !line.starts_with('|') {
            continue;
        }
        if line.starts_with("|-") {
            continue;
        }

        let cells = split_cells(line);
        if headers.is_empty() {
            headers = cells;
            continue;
        }
        if cells.len() != headers.len() {
            data.reject("table", "row width does not match header");
            continue;
        }

        let field = |name: &str| -> Option<&str> {
            headers
                .iter()
                .position(|h| h == name)
                .and_then(|i| cells.get(i))
                .map(String::as_str)
        };

        match section {
            Section::Accounts => {
                let row = field("Name").zip(field("Balance")).and_then(|(name, balance)| {
                    Some(AccountRow {
                        name: name.to_string(),
                        balance: balance.parse().ok()?,
                    })
                });
                match row {
                    Some(row) => data.accounts.push(row),
                    None => data.reject("account", line),
                }
            }
            Section::Categories => {
                let row = field("Name").zip(field("Type")).and_then(|(name, ty)| {
                    Some(CategoryRow {
                        name: name.to_string(),
                        op_type: ty.parse().ok()?,
                    })
                });
                match row {
                    Some(row) => data.categories.push(row),
                    None => data.reject("category", line),
                }
            }
            Section::Operations => {
                let row = (|| {
                    Some(OperationRow {
                        op_type: field("Type")?.parse().ok()?,
                        account_name: field("Account")?.to_string(),
                        category_name: field("Category")?.to_string(),
                        amount: field("Amount")?.parse().ok()?,
                        date: parse_datetime(field("Date")?)?,
                        description: field("Description")
                            .filter(|d| !d.is_empty())
                            .map(str::to_string),
                    })
                })();
                match row {
                    Some(row) => data.operations.push(row),
                    None => data.reject("operation", line),
                }
            }
            Section::None => {}
        }
    }

    data
}

/// Splits a `| a | b |` row into trimmed cells, keeping interior empties so
/// a blank description does not shift the columns after it.
fn split_cells(line: &str) -> Vec<String> {
    line.trim()
        .trim_start_matches('|')
        .trim_end_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Applying candidates through the facades

fn apply(db: &mut Db, mut data: ImportData) -> Result<ImportReport> {
    let mut report = ImportReport {
        skipped: data.malformed,
        ..ImportReport::default()
    };

    // Exports list operations newest first; replay must run oldest first
    // or an expense can hit the funds check before its funding income.
    data.operations.sort_by_key(|row| row.date);

    for row in &data.accounts {
        match ledger::create_account(db, &row.name, row.balance) {
            Ok(_) => report.accounts += 1,
            Err(err) => {
                eprintln!("skipping account '{}': {err}", row.name);
                report.skipped += 1;
            }
        }
    }

    for row in &data.categories {
        match ledger::create_category(db, &row.name, row.op_type) {
            Ok(_) => report.categories += 1,
            Err(err) => {
                eprintln!("skipping category '{}': {err}", row.name);
                report.skipped += 1;
            }
        }
    }

    for row in &data.operations {
        match apply_operation(db, row) {
            Ok(()) => report.operations += 1,
            Err(err) => {
                eprintln!("skipping operation: {err}");
                report.skipped += 1;
            }
        }
    }

    Ok(report)
}

fn apply_operation(db: &mut Db, row: &OperationRow) -> Result<()> {
    let account = db::find_account_by_name(db.conn(), &row.account_name)?
        .with_context(|| format!("unknown account '{}'", row.account_name))?;
    let category = db::find_category_by_name(db.conn(), &row.category_name)?
        .with_context(|| format!("unknown category '{}'", row.category_name))?;

    ledger::create_operation(
        db,
        row.op_type,
        account.id,
        category.id,
        row.amount,
        row.date,
        row.description.as_deref(),
    )?;
    Ok(())
}

impl ImportData {
    fn reject(&mut self, what: &str, detail: &str) {
        eprintln!("skipping malformed {what} row: {detail}");
        self.malformed += 1;
    }
}
