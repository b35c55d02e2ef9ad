//! The consistency core. Everything that must hold the balance invariant
//! (`account.balance == sum of signed operation amounts`) goes through the
//! functions here; callers never touch the gateway row functions directly
//! for operation create/delete or account delete.

use crate::db::{self, Db};
use crate::domain::{
    Account, BalanceSummary, Category, CategorySummary, Operation, OperationDetails,
    OperationType, day_range, month_bounds,
};
use crate::error::{LedgerError, LedgerResult};
use crate::factory;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Accounts

pub fn create_account(db: &Db, name: &str, initial_balance: Decimal) -> LedgerResult<Account> {
    let account = factory::new_account(name, initial_balance)?;
    ensure_account_name_free(db, &account.name)?;
    db::insert_account(db.conn(), &account)?;
    Ok(account)
}

pub fn create_account_with_details(
    db: &Db,
    name: &str,
    initial_balance: Decimal,
    password: &str,
    phone: Option<&str>,
    card_number: &str,
) -> LedgerResult<Account> {
    let account =
        factory::new_account_with_details(name, initial_balance, password, phone, card_number)?;
    ensure_account_name_free(db, &account.name)?;
    db::insert_account(db.conn(), &account)?;
    Ok(account)
}

fn ensure_account_name_free(db: &Db, name: &str) -> LedgerResult<()> {
    if db::account_name_exists(db.conn(), name)? {
        return Err(LedgerError::validation(format!(
            "An account named '{name}' already exists"
        )));
    }
    Ok(())
}

pub fn get_account(db: &Db, id: Uuid) -> LedgerResult<Account> {
    db::find_account(db.conn(), id)?.ok_or_else(|| LedgerError::account_not_found(id))
}

/// Name lookup returns an Option: callers use it to probe, unlike the
/// id-addressed reads which treat absence as an error.
pub fn get_account_by_name(db: &Db, name: &str) -> LedgerResult<Option<Account>> {
    db::find_account_by_name(db.conn(), name)
}

pub fn list_accounts(db: &Db, min_balance: Option<Decimal>) -> LedgerResult<Vec<Account>> {
    let mut accounts = db::list_accounts(db.conn())?;
    if let Some(min) = min_balance {
        accounts.retain(|a| a.balance >= min);
    }
    Ok(accounts)
}

pub fn rename_account(db: &Db, id: Uuid, new_name: &str) -> LedgerResult<Account> {
    factory::validate_name(new_name, "Account name")?;
    if let Some(existing) = db::find_account_by_name(db.conn(), new_name)? {
        if existing.id != id {
            return Err(LedgerError::validation(format!(
                "An account named '{new_name}' already exists"
            )));
        }
    }
    if !db::update_account_name(db.conn(), id, new_name)? {
        return Err(LedgerError::account_not_found(id));
    }
    get_account(db, id)
}

/// Deletes the account together with all of its operations, atomically.
pub fn delete_account(db: &mut Db, id: Uuid) -> LedgerResult<bool> {
    db.with_tx(|tx| {
        if !db::account_exists(tx, id)? {
            return Ok(false);
        }
        db::delete_operations_by_account(tx, id)?;
        db::delete_account_row(tx, id)
    })
}

pub fn total_balance(db: &Db) -> LedgerResult<Decimal> {
    db::total_balance(db.conn())
}

pub fn balance_summary(
    db: &Db,
    account_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> LedgerResult<BalanceSummary> {
    ensure_range(from, to)?;
    if !db::account_exists(db.conn(), account_id)? {
        return Err(LedgerError::account_not_found(account_id));
    }

    let (start, end) = day_range(from, to);
    let total_income =
        db::sum_by_account_in_range_and_type(db.conn(), account_id, start, end, OperationType::Income)?
            .unwrap_or(Decimal::ZERO);
    let total_expenses =
        db::sum_by_account_in_range_and_type(db.conn(), account_id, start, end, OperationType::Expense)?
            .unwrap_or(Decimal::ZERO);

    Ok(BalanceSummary {
        total_income,
        total_expenses,
        net_change: total_income - total_expenses,
    })
}

/// Reconciliation path for the balance invariant: recomputes the balance
/// from scratch as sum(income) - sum(expenses) and persists it.
pub fn recalculate_balance(db: &mut Db, account_id: Uuid) -> LedgerResult<Account> {
    db.with_tx(|tx| {
        if !db::account_exists(tx, account_id)? {
            return Err(LedgerError::account_not_found(account_id));
        }

        let income = db::sum_by_account_and_type(tx, account_id, OperationType::Income)?
            .unwrap_or(Decimal::ZERO);
        let expenses = db::sum_by_account_and_type(tx, account_id, OperationType::Expense)?
            .unwrap_or(Decimal::ZERO);

        db::set_account_balance(tx, account_id, income - expenses)?;
        db::find_account(tx, account_id)?.ok_or_else(|| LedgerError::account_not_found(account_id))
    })
}

pub fn account_operations(db: &Db, account_id: Uuid) -> LedgerResult<Vec<Operation>> {
    if !db::account_exists(db.conn(), account_id)? {
        return Err(LedgerError::account_not_found(account_id));
    }
    db::list_operations_by_account(db.conn(), account_id)
}

/// Range listing scoped to one account. Fetches the global date range
/// (date descending) and filters in memory, preserving relative order.
pub fn account_operations_in_range(
    db: &Db,
    account_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> LedgerResult<Vec<Operation>> {
    ensure_range(from, to)?;
    if !db::account_exists(db.conn(), account_id)? {
        return Err(LedgerError::account_not_found(account_id));
    }

    let (start, end) = day_range(from, to);
    let mut ops = db::list_operations_in_range(db.conn(), start, end)?;
    ops.retain(|op| op.account_id == account_id);
    Ok(ops)
}

pub fn account_income_operations(db: &Db, account_id: Uuid) -> LedgerResult<Vec<Operation>> {
    let mut ops = account_operations(db, account_id)?;
    ops.retain(Operation::is_income);
    Ok(ops)
}

fn ensure_range(from: NaiveDate, to: NaiveDate) -> LedgerResult<()> {
    if from > to {
        return Err(LedgerError::validation("Start date cannot be after end date"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Operations

pub fn create_income(
    db: &mut Db,
    account_id: Uuid,
    category_id: Uuid,
    amount: Decimal,
    date: NaiveDateTime,
    description: Option<&str>,
) -> LedgerResult<Operation> {
    db.with_tx(|tx| {
        db::find_account(tx, account_id)?.ok_or_else(|| LedgerError::account_not_found(account_id))?;
        let category = db::find_category(tx, category_id)?
            .ok_or_else(|| LedgerError::category_not_found(category_id))?;

        if category.op_type != OperationType::Income {
            return Err(LedgerError::CategoryTypeMismatch {
                name: category.name,
                expected: OperationType::Income,
            });
        }

        let operation = factory::new_operation(
            OperationType::Income,
            account_id,
            amount,
            date,
            description,
            category_id,
        )?;

        db::insert_operation(tx, &operation)?;
        db::adjust_account_balance(tx, account_id, amount)?;
        Ok(operation)
    })
}

pub fn create_expense(
    db: &mut Db,
    account_id: Uuid,
    category_id: Uuid,
    amount: Decimal,
    date: NaiveDateTime,
    description: Option<&str>,
) -> LedgerResult<Operation> {
    db.with_tx(|tx| {
        let account = db::find_account(tx, account_id)?
            .ok_or_else(|| LedgerError::account_not_found(account_id))?;
        let category = db::find_category(tx, category_id)?
            .ok_or_else(|| LedgerError::category_not_found(category_id))?;

        if category.op_type != OperationType::Expense {
            return Err(LedgerError::CategoryTypeMismatch {
                name: category.name,
                expected: OperationType::Expense,
            });
        }

        if !account.has_sufficient_funds(amount) {
            return Err(LedgerError::InsufficientFunds {
                balance: account.balance,
                requested: amount,
            });
        }

        let operation = factory::new_operation(
            OperationType::Expense,
            account_id,
            amount,
            date,
            description,
            category_id,
        )?;

        db::insert_operation(tx, &operation)?;
        db::adjust_account_balance(tx, account_id, -amount)?;
        Ok(operation)
    })
}

pub fn create_operation(
    db: &mut Db,
    op_type: OperationType,
    account_id: Uuid,
    category_id: Uuid,
    amount: Decimal,
    date: NaiveDateTime,
    description: Option<&str>,
) -> LedgerResult<Operation> {
    match op_type {
        OperationType::Income => create_income(db, account_id, category_id, amount, date, description),
        OperationType::Expense => {
            create_expense(db, account_id, category_id, amount, date, description)
        }
    }
}

/// Deletes the operation and reverses its create-time balance adjustment,
/// atomically. The reversal is the exact algebraic inverse: subtracting the
/// signed amount restores the pre-create balance.
pub fn delete_operation(db: &mut Db, id: Uuid) -> LedgerResult<bool> {
    db.with_tx(|tx| {
        let Some(operation) = db::find_operation(tx, id)? else {
            return Ok(false);
        };

        db::adjust_account_balance(tx, operation.account_id, -operation.signed_amount())?;
        db::delete_operation_row(tx, id)
    })
}

pub fn get_operation(db: &Db, id: Uuid) -> LedgerResult<Operation> {
    db::find_operation(db.conn(), id)?.ok_or_else(|| LedgerError::operation_not_found(id))
}

pub fn operation_details(db: &Db, id: Uuid) -> LedgerResult<OperationDetails> {
    let operation = get_operation(db, id)?;

    let account_name = db::find_account(db.conn(), operation.account_id)?
        .map(|a| a.name)
        .unwrap_or_else(|| "-".to_string());
    let category_name = db::find_category(db.conn(), operation.category_id)?
        .map(|c| c.name)
        .unwrap_or_else(|| "-".to_string());

    Ok(OperationDetails {
        operation,
        account_name,
        category_name,
    })
}

pub fn update_operation_description(
    db: &Db,
    id: Uuid,
    description: Option<&str>,
) -> LedgerResult<Operation> {
    let description = description.map(str::trim).filter(|d| !d.is_empty());
    if !db::update_operation_description(db.conn(), id, description)? {
        return Err(LedgerError::operation_not_found(id));
    }
    get_operation(db, id)
}

pub fn list_operations(db: &Db) -> LedgerResult<Vec<Operation>> {
    db::list_operations(db.conn())
}

pub fn operations_by_type(db: &Db, op_type: OperationType) -> LedgerResult<Vec<Operation>> {
    db::list_operations_by_type(db.conn(), op_type)
}

pub fn operations_in_range(db: &Db, from: NaiveDate, to: NaiveDate) -> LedgerResult<Vec<Operation>> {
    ensure_range(from, to)?;
    let (start, end) = day_range(from, to);
    db::list_operations_in_range(db.conn(), start, end)
}

pub fn operations_on_day(db: &Db, day: NaiveDate) -> LedgerResult<Vec<Operation>> {
    operations_in_range(db, day, day)
}

pub fn operations_by_month(db: &Db, year: i32, month: u32) -> LedgerResult<Vec<Operation>> {
    let (first, last) = month_bounds(year, month)
        .ok_or_else(|| LedgerError::validation(format!("Invalid month: {year}-{month:02}")))?;
    operations_in_range(db, first, last)
}

pub fn total_income(db: &Db, from: NaiveDate, to: NaiveDate) -> LedgerResult<Decimal> {
    range_sum(db, from, to, OperationType::Income)
}

pub fn total_expenses(db: &Db, from: NaiveDate, to: NaiveDate) -> LedgerResult<Decimal> {
    range_sum(db, from, to, OperationType::Expense)
}

pub fn net_change(db: &Db, from: NaiveDate, to: NaiveDate) -> LedgerResult<Decimal> {
    Ok(total_income(db, from, to)? - total_expenses(db, from, to)?)
}

fn range_sum(
    db: &Db,
    from: NaiveDate,
    to: NaiveDate,
    op_type: OperationType,
) -> LedgerResult<Decimal> {
    ensure_range(from, to)?;
    let (start, end) = day_range(from, to);
    Ok(db::sum_in_range_by_type(db.conn(), start, end, op_type)?.unwrap_or(Decimal::ZERO))
}

/// Groups a range listing by calendar day, days ascending; within each day
/// the range query's descending-date order is kept.
pub fn operations_grouped_by_day(
    db: &Db,
    from: NaiveDate,
    to: NaiveDate,
) -> LedgerResult<BTreeMap<NaiveDate, Vec<Operation>>> {
    let operations = operations_in_range(db, from, to)?;

    let mut grouped: BTreeMap<NaiveDate, Vec<Operation>> = BTreeMap::new();
    for op in operations {
        grouped.entry(op.date.date()).or_default().push(op);
    }
    Ok(grouped)
}

// ---------------------------------------------------------------------------
// Categories

pub fn create_category(db: &Db, name: &str, op_type: OperationType) -> LedgerResult<Category> {
    let category = factory::new_category(name, op_type)?;
    ensure_category_name_free(db, &category.name)?;
    db::insert_category(db.conn(), &category)?;
    Ok(category)
}

fn ensure_category_name_free(db: &Db, name: &str) -> LedgerResult<()> {
    if db::category_name_exists(db.conn(), name)? {
        return Err(LedgerError::validation(format!(
            "A category named '{name}' already exists"
        )));
    }
    Ok(())
}

pub fn get_category(db: &Db, id: Uuid) -> LedgerResult<Category> {
    db::find_category(db.conn(), id)?.ok_or_else(|| LedgerError::category_not_found(id))
}

pub fn list_categories(db: &Db, op_type: Option<OperationType>) -> LedgerResult<Vec<Category>> {
    match op_type {
        Some(t) => db::list_categories_by_type(db.conn(), t),
        None => db::list_categories(db.conn()),
    }
}

pub fn rename_category(db: &Db, id: Uuid, new_name: &str) -> LedgerResult<Category> {
    factory::validate_name(new_name, "Category name")?;
    if let Some(existing) = db::find_category_by_name(db.conn(), new_name)? {
        if existing.id != id {
            return Err(LedgerError::validation(format!(
                "A category named '{new_name}' already exists"
            )));
        }
    }
    if !db::update_category_name(db.conn(), id, new_name)? {
        return Err(LedgerError::category_not_found(id));
    }
    get_category(db, id)
}

/// Refuses while any operation still references the category.
pub fn delete_category(db: &mut Db, id: Uuid) -> LedgerResult<bool> {
    db.with_tx(|tx| {
        if db::count_operations_by_category(tx, id)? > 0 {
            return Ok(false);
        }
        db::delete_category_row(tx, id)
    })
}

/// Expense totals keyed by category name; zero-sum categories are omitted.
pub fn spending_by_category(db: &Db) -> LedgerResult<Vec<(String, Decimal)>> {
    totals_by_category(db, OperationType::Expense)
}

/// Income totals keyed by category name; zero-sum categories are omitted.
pub fn income_by_category(db: &Db) -> LedgerResult<Vec<(String, Decimal)>> {
    totals_by_category(db, OperationType::Income)
}

fn totals_by_category(db: &Db, op_type: OperationType) -> LedgerResult<Vec<(String, Decimal)>> {
    let categories = db::list_categories_by_type(db.conn(), op_type)?;

    let mut out = Vec::new();
    for category in categories {
        if let Some(total) = db::sum_by_category(db.conn(), category.id)? {
            if total > Decimal::ZERO {
                out.push((category.name, total));
            }
        }
    }
    Ok(out)
}

/// Every category of the type, zero-filled, ordered by descending total.
/// The sort is stable so equal totals keep their listing order.
pub fn categories_sorted_by_amount(
    db: &Db,
    op_type: OperationType,
) -> LedgerResult<Vec<CategorySummary>> {
    let categories = db::list_categories_by_type(db.conn(), op_type)?;

    let mut summaries = Vec::with_capacity(categories.len());
    for category in categories {
        let amount = db::sum_by_category(db.conn(), category.id)?.unwrap_or(Decimal::ZERO);
        summaries.push(CategorySummary { category, amount });
    }

    summaries.sort_by(|a, b| b.amount.cmp(&a.amount));
    Ok(summaries)
}
