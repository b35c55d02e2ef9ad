//! Export of the three entity collections to JSON or bordered-table text.
//! Operation records are enriched with resolved account/category names,
//! best effort: the name fields are simply omitted (JSON) or dashed (table)
//! when a reference no longer resolves.

use crate::db::{self, Db};
use crate::domain::{format_datetime, Operation, TABLE_DATETIME_FORMAT};
use anyhow::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct ExportSelection {
    pub accounts: bool,
    pub categories: bool,
    pub operations: bool,
}

impl Default for ExportSelection {
    fn default() -> Self {
        Self {
            accounts: true,
            categories: true,
            operations: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<AccountRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<CategoryRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operations: Option<Vec<OperationRecord>>,
}

#[derive(Debug, Serialize)]
pub struct AccountRecord {
    pub id: Uuid,
    pub name: String,
    pub balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub op_type: String,
}

#[derive(Debug, Serialize)]
pub struct OperationRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(rename = "bankAccountId")]
    pub account_id: Uuid,
    pub amount: Decimal,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "categoryId")]
    pub category_id: Uuid,
    #[serde(rename = "accountName", skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(rename = "categoryName", skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

pub fn export_json(db: &Db, selection: ExportSelection) -> Result<String> {
    let doc = ExportDocument {
        accounts: if selection.accounts {
            Some(
                db::list_accounts(db.conn())?
                    .into_iter()
                    .map(|a| AccountRecord {
                        id: a.id,
                        name: a.name,
                        balance: a.balance,
                    })
                    .collect(),
            )
        } else {
            None
        },
        categories: if selection.categories {
            Some(
                db::list_categories(db.conn())?
                    .into_iter()
                    .map(|c| CategoryRecord {
                        id: c.id,
                        name: c.name,
                        op_type: c.op_type.to_string(),
                    })
                    .collect(),
            )
        } else {
            None
        },
        operations: if selection.operations {
            let mut records = Vec::new();
            for op in db::list_operations(db.conn())? {
                records.push(operation_record(db, op)?);
            }
            Some(records)
        } else {
            None
        },
    };

    Ok(serde_json::to_string_pretty(&doc)?)
}

fn operation_record(db: &Db, op: Operation) -> Result<OperationRecord> {
    let account_name = db::find_account(db.conn(), op.account_id)?.map(|a| a.name);
    let category_name = db::find_category(db.conn(), op.category_id)?.map(|c| c.name);

    Ok(OperationRecord {
        id: op.id,
        op_type: op.op_type.to_string(),
        account_id: op.account_id,
        amount: op.amount,
        date: format_datetime(op.date),
        description: op.description,
        category_id: op.category_id,
        account_name,
        category_name,
    })
}

pub fn export_table(db: &Db, selection: ExportSelection) -> Result<String> {
    let mut out = String::new();

    if selection.accounts {
        let accounts = db::list_accounts(db.conn())?;
        if !accounts.is_empty() {
            out.push_str("== ACCOUNTS ==\n");
            let rows: Vec<Vec<String>> = accounts
                .iter()
                .map(|a| vec![a.id.to_string(), a.name.clone(), a.balance.to_string()])
                .collect();
            out.push_str(&render_table(&["ID", "Name", "Balance"], &rows));
            out.push('\n');
        }
    }

    if selection.categories {
        let categories = db::list_categories(db.conn())?;
        if !categories.is_empty() {
            out.push_str("== CATEGORIES ==\n");
            let rows: Vec<Vec<String>> = categories
                .iter()
                .map(|c| vec![c.id.to_string(), c.name.clone(), c.op_type.to_string()])
                .collect();
            out.push_str(&render_table(&["ID", "Name", "Type"], &rows));
            out.push('\n');
        }
    }

    if selection.operations {
        let operations = db::list_operations(db.conn())?;
        if !operations.is_empty() {
            out.push_str("== OPERATIONS ==\n");
            let mut rows = Vec::with_capacity(operations.len());
            for op in operations {
                let account = db::find_account(db.conn(), op.account_id)?
                    .map(|a| a.name)
                    .unwrap_or_else(|| "-".to_string());
                let category = db::find_category(db.conn(), op.category_id)?
                    .map(|c| c.name)
                    .unwrap_or_else(|| "-".to_string());
                rows.push(vec![
                    op.id.to_string(),
                    op.op_type.to_string(),
                    account,
                    op.amount.to_string(),
                    op.date.format(TABLE_DATETIME_FORMAT).to_string(),
                    category,
                    op.description.clone().unwrap_or_default(),
                ]);
            }
            out.push_str(&render_table(
                &["ID", "Type", "Account", "Amount", "Date", "Category", "Description"],
                &rows,
            ));
        }
    }

    Ok(out)
}

/// Bordered grid: header row, dash separator, data rows. Column widths fit
/// the widest cell.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    push_row(&mut out, headers.iter().map(|h| h.to_string()), &widths);

    out.push('|');
    for width in &widths {
        out.push_str(&"-".repeat(width + 2));
        out.push('|');
    }
    out.push('\n');

    for row in rows {
        push_row(&mut out, row.iter().cloned(), &widths);
    }
    out
}

fn push_row(out: &mut String, cells: impl Iterator<Item = String>, widths: &[usize]) {
    out.push('|');
    for (cell, width) in cells.zip(widths) {
        let pad = width.saturating_sub(cell.chars().count());
        out.push(' ');
        out.push_str(&cell);
        out.push_str(&" ".repeat(pad));
        out.push_str(" |");
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::now_local;
    use crate::domain::OperationType;
    use crate::ledger;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal")
    }

    fn seeded_db() -> Db {
        let mut db = Db::open_in_memory().expect("db");
        let account = ledger::create_account(&db, "Checking", Decimal::ZERO).expect("account");
        let salary = ledger::create_category(&db, "Salary", OperationType::Income).expect("cat");
        ledger::create_income(&mut db, account.id, salary.id, dec("100.50"), now_local(), Some("pay"))
            .expect("income");
        db
    }

    #[test]
    fn json_export_carries_all_sections_with_resolved_names() {
        let db = seeded_db();
        let json = export_json(&db, ExportSelection::default()).expect("export");
        let doc: serde_json::Value = serde_json::from_str(&json).expect("parse");

        assert_eq!(doc["accounts"][0]["name"], "Checking");
        assert_eq!(doc["accounts"][0]["balance"], "100.50");
        assert_eq!(doc["categories"][0]["type"], "INCOME");

        let op = &doc["operations"][0];
        assert_eq!(op["type"], "INCOME");
        assert_eq!(op["amount"], "100.50");
        assert_eq!(op["accountName"], "Checking");
        assert_eq!(op["categoryName"], "Salary");
        assert!(op["bankAccountId"].is_string());
    }

    #[test]
    fn json_export_respects_selection_flags() {
        let db = seeded_db();
        let json = export_json(
            &db,
            ExportSelection {
                accounts: true,
                categories: false,
                operations: false,
            },
        )
        .expect("export");
        let doc: serde_json::Value = serde_json::from_str(&json).expect("parse");

        assert!(doc.get("accounts").is_some());
        assert!(doc.get("categories").is_none());
        assert!(doc.get("operations").is_none());
    }

    #[test]
    fn table_export_has_section_markers_and_grid() {
        let db = seeded_db();
        let text = export_table(&db, ExportSelection::default()).expect("export");

        assert!(text.contains("== ACCOUNTS =="));
        assert!(text.contains("== CATEGORIES =="));
        assert!(text.contains("== OPERATIONS =="));
        assert!(text.contains("| Checking"));
        assert!(text.contains("| Salary"));
        assert!(text.contains("|---"));
    }

    #[test]
    fn empty_sections_are_omitted_from_table_export() {
        let db = Db::open_in_memory().expect("db");
        let text = export_table(&db, ExportSelection::default()).expect("export");
        assert!(text.is_empty());
    }

    #[test]
    fn render_table_pads_to_widest_cell() {
        let rows = vec![
            vec!["a".to_string(), "long value".to_string()],
            vec!["bb".to_string(), "x".to_string()],
        ];
        let table = render_table(&["K", "V"], &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l.len() == lines[0].len()));
        assert_eq!(lines[0], "| K  | V          |");
        assert_eq!(lines[1], "|----|------------|");
    }
}
