//! Persistence gateway over SQLite. Row-level functions take a plain
//! `&Connection` so they compose both standalone and inside a transaction
//! (`rusqlite::Transaction` derefs to `Connection`). The gateway knows
//! nothing about the balance invariant; that lives in the ledger layer.

use crate::config::AppPaths;
use crate::domain::{
    Account, Category, Operation, OperationType, format_datetime, DATETIME_FORMAT,
};
use crate::error::{LedgerError, LedgerResult};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{Connection, Transaction, params};
use rust_decimal::Decimal;
use uuid::Uuid;

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(paths: &AppPaths) -> Result<Self> {
        let db_path = paths.db_path()?;
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open DB {}", db_path.display()))?;

        let db = Self { conn };
        db.migrate().context("Failed to run schema migration")?;
        Ok(db)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory DB")?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                balance TEXT NOT NULL,
                password_hash TEXT,
                phone_number TEXT,
                card_number TEXT
            );

            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                type TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS operations (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL,
                account_id TEXT NOT NULL REFERENCES accounts(id),
                amount TEXT NOT NULL,
                date TEXT NOT NULL,
                description TEXT,
                category_id TEXT NOT NULL REFERENCES categories(id)
            );

            CREATE INDEX IF NOT EXISTS idx_operations_date ON operations(date);
            CREATE INDEX IF NOT EXISTS idx_operations_account ON operations(account_id);
            CREATE INDEX IF NOT EXISTS idx_operations_category ON operations(category_id);
            "#,
        )?;
        Ok(())
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Runs `f` inside a transaction: committed when `f` succeeds, rolled
    /// back entirely otherwise. Every composite mutation (operation create
    /// or delete with balance adjustment, cascading account delete) goes
    /// through here so partial application is impossible.
    pub fn with_tx<T>(
        &mut self,
        f: impl FnOnce(&Transaction) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let tx = self.conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Accounts

pub fn insert_account(conn: &Connection, account: &Account) -> LedgerResult<()> {
    conn.execute(
        r#"
        INSERT INTO accounts (id, name, balance, password_hash, phone_number, card_number)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            account.id.to_string(),
            account.name,
            account.balance.to_string(),
            account.password_hash,
            account.phone_number,
            account.card_number,
        ],
    )?;
    Ok(())
}

pub fn update_account_name(conn: &Connection, id: Uuid, name: &str) -> LedgerResult<bool> {
    let changed = conn.execute(
        "UPDATE accounts SET name = ?2 WHERE id = ?1",
        params![id.to_string(), name],
    )?;
    Ok(changed > 0)
}

pub fn set_account_balance(conn: &Connection, id: Uuid, balance: Decimal) -> LedgerResult<bool> {
    let changed = conn.execute(
        "UPDATE accounts SET balance = ?2 WHERE id = ?1",
        params![id.to_string(), balance.to_string()],
    )?;
    Ok(changed > 0)
}

/// Applies a signed delta to the stored balance. Read-modify-write is safe
/// here because callers hold the enclosing transaction.
pub fn adjust_account_balance(conn: &Connection, id: Uuid, delta: Decimal) -> LedgerResult<bool> {
    let Some(account) = find_account(conn, id)? else {
        return Ok(false);
    };
    set_account_balance(conn, id, account.balance + delta)
}

pub fn delete_account_row(conn: &Connection, id: Uuid) -> LedgerResult<bool> {
    let affected = conn.execute("DELETE FROM accounts WHERE id = ?1", params![id.to_string()])?;
    Ok(affected > 0)
}

pub fn find_account(conn: &Connection, id: Uuid) -> LedgerResult<Option<Account>> {
    let mut stmt = conn.prepare(&format!("{ACCOUNT_SELECT} WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![id.to_string()], account_row)?;
    rows.next().transpose()?.map(parse_account).transpose()
}

pub fn find_account_by_name(conn: &Connection, name: &str) -> LedgerResult<Option<Account>> {
    let mut stmt = conn.prepare(&format!("{ACCOUNT_SELECT} WHERE name = ?1"))?;
    let mut rows = stmt.query_map(params![name], account_row)?;
    rows.next().transpose()?.map(parse_account).transpose()
}

pub fn account_exists(conn: &Connection, id: Uuid) -> LedgerResult<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM accounts WHERE id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

pub fn account_name_exists(conn: &Connection, name: &str) -> LedgerResult<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM accounts WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

pub fn list_accounts(conn: &Connection) -> LedgerResult<Vec<Account>> {
    let mut stmt = conn.prepare(&format!("{ACCOUNT_SELECT} ORDER BY name ASC"))?;
    let rows = stmt.query_map([], account_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(parse_account(row?)?);
    }
    Ok(out)
}

const ACCOUNT_SELECT: &str =
    "SELECT id, name, balance, password_hash, phone_number, card_number FROM accounts";

type AccountRow = (String, String, String, Option<String>, Option<String>, Option<String>);

fn account_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn parse_account(raw: AccountRow) -> LedgerResult<Account> {
    let (id, name, balance, password_hash, phone_number, card_number) = raw;
    Ok(Account {
        id: parse_uuid(&id)?,
        name,
        balance: parse_decimal(&balance)?,
        password_hash,
        phone_number,
        card_number,
    })
}

// ---------------------------------------------------------------------------
// Categories

pub fn insert_category(conn: &Connection, category: &Category) -> LedgerResult<()> {
    conn.execute(
        "INSERT INTO categories (id, name, type) VALUES (?1, ?2, ?3)",
        params![
            category.id.to_string(),
            category.name,
            category.op_type.to_string(),
        ],
    )?;
    Ok(())
}

pub fn update_category_name(conn: &Connection, id: Uuid, name: &str) -> LedgerResult<bool> {
    let changed = conn.execute(
        "UPDATE categories SET name = ?2 WHERE id = ?1",
        params![id.to_string(), name],
    )?;
    Ok(changed > 0)
}

pub fn delete_category_row(conn: &Connection, id: Uuid) -> LedgerResult<bool> {
    let affected =
        conn.execute("DELETE FROM categories WHERE id = ?1", params![id.to_string()])?;
    Ok(affected > 0)
}

pub fn find_category(conn: &Connection, id: Uuid) -> LedgerResult<Option<Category>> {
    let mut stmt = conn.prepare("SELECT id, name, type FROM categories WHERE id = ?1")?;
    let mut rows = stmt.query_map(params![id.to_string()], category_row)?;
    rows.next().transpose()?.map(parse_category).transpose()
}

pub fn find_category_by_name(conn: &Connection, name: &str) -> LedgerResult<Option<Category>> {
    let mut stmt = conn.prepare("SELECT id, name, type FROM categories WHERE name = ?1")?;
    let mut rows = stmt.query_map(params![name], category_row)?;
    rows.next().transpose()?.map(parse_category).transpose()
}

pub fn category_name_exists(conn: &Connection, name: &str) -> LedgerResult<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM categories WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

pub fn list_categories(conn: &Connection) -> LedgerResult<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name, type FROM categories ORDER BY name ASC")?;
    collect_categories(stmt.query_map([], category_row)?)
}

pub fn list_categories_by_type(
    conn: &Connection,
    op_type: OperationType,
) -> LedgerResult<Vec<Category>> {
    let mut stmt =
        conn.prepare("SELECT id, name, type FROM categories WHERE type = ?1 ORDER BY name ASC")?;
    collect_categories(stmt.query_map(params![op_type.to_string()], category_row)?)
}

fn category_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn parse_category(raw: (String, String, String)) -> LedgerResult<Category> {
    let (id, name, op_type) = raw;
    Ok(Category {
        id: parse_uuid(&id)?,
        name,
        op_type: parse_op_type(&op_type)?,
    })
}

fn collect_categories(
    rows: impl Iterator<Item = rusqlite::Result<(String, String, String)>>,
) -> LedgerResult<Vec<Category>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(parse_category(row?)?);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Operations

pub fn insert_operation(conn: &Connection, operation: &Operation) -> LedgerResult<()> {
    conn.execute(
        r#"
        INSERT INTO operations (id, type, account_id, amount, date, description, category_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            operation.id.to_string(),
            operation.op_type.to_string(),
            operation.account_id.to_string(),
            operation.amount.to_string(),
            format_datetime(operation.date),
            operation.description,
            operation.category_id.to_string(),
        ],
    )?;
    Ok(())
}

pub fn update_operation_description(
    conn: &Connection,
    id: Uuid,
    description: Option<&str>,
) -> LedgerResult<bool> {
    let changed = conn.execute(
        "UPDATE operations SET description = ?2 WHERE id = ?1",
        params![id.to_string(), description],
    )?;
    Ok(changed > 0)
}

pub fn delete_operation_row(conn: &Connection, id: Uuid) -> LedgerResult<bool> {
    let affected =
        conn.execute("DELETE FROM operations WHERE id = ?1", params![id.to_string()])?;
    Ok(affected > 0)
}

pub fn delete_operations_by_account(conn: &Connection, account_id: Uuid) -> LedgerResult<usize> {
    let affected = conn.execute(
        "DELETE FROM operations WHERE account_id = ?1",
        params![account_id.to_string()],
    )?;
    Ok(affected)
}

pub fn find_operation(conn: &Connection, id: Uuid) -> LedgerResult<Option<Operation>> {
    let mut stmt = conn.prepare(&format!("{OPERATION_SELECT} WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![id.to_string()], operation_row)?;
    rows.next().transpose()?.map(parse_operation).transpose()
}

pub fn list_operations(conn: &Connection) -> LedgerResult<Vec<Operation>> {
    let mut stmt = conn.prepare(&format!("{OPERATION_SELECT} ORDER BY date DESC"))?;
    collect_operations(stmt.query_map([], operation_row)?)
}

pub fn list_operations_by_account(
    conn: &Connection,
    account_id: Uuid,
) -> LedgerResult<Vec<Operation>> {
    let mut stmt =
        conn.prepare(&format!("{OPERATION_SELECT} WHERE account_id = ?1 ORDER BY date DESC"))?;
    collect_operations(stmt.query_map(params![account_id.to_string()], operation_row)?)
}

pub fn list_operations_by_type(
    conn: &Connection,
    op_type: OperationType,
) -> LedgerResult<Vec<Operation>> {
    let mut stmt =
        conn.prepare(&format!("{OPERATION_SELECT} WHERE type = ?1 ORDER BY date DESC"))?;
    collect_operations(stmt.query_map(params![op_type.to_string()], operation_row)?)
}

pub fn count_operations_by_category(conn: &Connection, category_id: Uuid) -> LedgerResult<usize> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM operations WHERE category_id = ?1",
        params![category_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(n as usize)
}

/// Range query; rows come back sorted by date descending.
pub fn list_operations_in_range(
    conn: &Connection,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> LedgerResult<Vec<Operation>> {
    let mut stmt = conn.prepare(&format!(
        "{OPERATION_SELECT} WHERE date BETWEEN ?1 AND ?2 ORDER BY date DESC"
    ))?;
    collect_operations(stmt.query_map(
        params![format_datetime(start), format_datetime(end)],
        operation_row,
    )?)
}

const OPERATION_SELECT: &str =
    "SELECT id, type, account_id, amount, date, description, category_id FROM operations";

type OperationRow = (String, String, String, String, String, Option<String>, String);

fn operation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<OperationRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn parse_operation(raw: OperationRow) -> LedgerResult<Operation> {
    let (id, op_type, account_id, amount, date, description, category_id) = raw;
    Ok(Operation {
        id: parse_uuid(&id)?,
        op_type: parse_op_type(&op_type)?,
        account_id: parse_uuid(&account_id)?,
        amount: parse_decimal(&amount)?,
        date: NaiveDateTime::parse_from_str(&date, DATETIME_FORMAT)
            .map_err(|e| LedgerError::Corrupt(format!("date '{date}': {e}")))?,
        description,
        category_id: parse_uuid(&category_id)?,
    })
}

fn collect_operations(
    rows: impl Iterator<Item = rusqlite::Result<OperationRow>>,
) -> LedgerResult<Vec<Operation>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(parse_operation(row?)?);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Aggregate sums. Amounts are stored as decimal TEXT, so sums fold in the
// application instead of SQL SUM (which would coerce to floats).

pub fn sum_in_range_by_type(
    conn: &Connection,
    start: NaiveDateTime,
    end: NaiveDateTime,
    op_type: OperationType,
) -> LedgerResult<Option<Decimal>> {
    let mut stmt = conn.prepare(
        "SELECT amount FROM operations WHERE date BETWEEN ?1 AND ?2 AND type = ?3",
    )?;
    let rows = stmt.query_map(
        params![format_datetime(start), format_datetime(end), op_type.to_string()],
        |row| row.get::<_, String>(0),
    )?;
    sum_rows(rows)
}

pub fn sum_by_account_in_range_and_type(
    conn: &Connection,
    account_id: Uuid,
    start: NaiveDateTime,
    end: NaiveDateTime,
    op_type: OperationType,
) -> LedgerResult<Option<Decimal>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT amount FROM operations
        WHERE account_id = ?1 AND date BETWEEN ?2 AND ?3 AND type = ?4
        "#,
    )?;
    let rows = stmt.query_map(
        params![
            account_id.to_string(),
            format_datetime(start),
            format_datetime(end),
            op_type.to_string()
        ],
        |row| row.get::<_, String>(0),
    )?;
    sum_rows(rows)
}

pub fn sum_by_account_and_type(
    conn: &Connection,
    account_id: Uuid,
    op_type: OperationType,
) -> LedgerResult<Option<Decimal>> {
    let mut stmt = conn
        .prepare("SELECT amount FROM operations WHERE account_id = ?1 AND type = ?2")?;
    let rows = stmt.query_map(
        params![account_id.to_string(), op_type.to_string()],
        |row| row.get::<_, String>(0),
    )?;
    sum_rows(rows)
}

pub fn sum_by_category(conn: &Connection, category_id: Uuid) -> LedgerResult<Option<Decimal>> {
    let mut stmt = conn.prepare("SELECT amount FROM operations WHERE category_id = ?1")?;
    let rows = stmt.query_map(params![category_id.to_string()], |row| {
        row.get::<_, String>(0)
    })?;
    sum_rows(rows)
}

pub fn total_balance(conn: &Connection) -> LedgerResult<Decimal> {
    let mut stmt = conn.prepare("SELECT balance FROM accounts")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    Ok(sum_rows(rows)?.unwrap_or(Decimal::ZERO))
}

fn sum_rows(
    rows: impl Iterator<Item = rusqlite::Result<String>>,
) -> LedgerResult<Option<Decimal>> {
    let mut total: Option<Decimal> = None;
    for raw in rows {
        let amount = parse_decimal(&raw?)?;
        total = Some(total.unwrap_or(Decimal::ZERO) + amount);
    }
    Ok(total)
}

// ---------------------------------------------------------------------------

fn parse_uuid(raw: &str) -> LedgerResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| LedgerError::Corrupt(format!("uuid '{raw}': {e}")))
}

fn parse_decimal(raw: &str) -> LedgerResult<Decimal> {
    raw.parse()
        .map_err(|e| LedgerError::Corrupt(format!("decimal '{raw}': {e}")))
}

fn parse_op_type(raw: &str) -> LedgerResult<OperationType> {
    raw.parse().map_err(LedgerError::Corrupt)
}
