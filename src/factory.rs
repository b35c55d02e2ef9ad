//! Validating constructors for the entity model. Each returns a fully valid
//! entity with a fresh id, or fails fast on the first violated rule.

use crate::domain::{Account, Category, Operation, OperationType};
use crate::error::{LedgerError, LedgerResult};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use uuid::Uuid;

const MAX_NAME_LEN: usize = 255;
const MIN_PASSWORD_LEN: usize = 6;

pub fn new_account(name: &str, initial_balance: Decimal) -> LedgerResult<Account> {
    validate_name(name, "Account name")?;
    if initial_balance < Decimal::ZERO {
        return Err(LedgerError::validation("Start balance cannot be negative"));
    }

    Ok(Account {
        id: Uuid::new_v4(),
        name: name.to_string(),
        balance: initial_balance,
        password_hash: None,
        phone_number: None,
        card_number: None,
    })
}

/// Extended variant carrying credentials. The password is stored hashed;
/// the phone number is optional and skipped when blank.
pub fn new_account_with_details(
    name: &str,
    initial_balance: Decimal,
    password: &str,
    phone: Option<&str>,
    card_number: &str,
) -> LedgerResult<Account> {
    let mut account = new_account(name, initial_balance)?;

    if password.is_empty() {
        return Err(LedgerError::validation("Password cannot be empty"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(LedgerError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let phone = phone.map(str::trim).filter(|p| !p.is_empty());
    if let Some(phone) = phone {
        if !is_valid_phone(phone) {
            return Err(LedgerError::validation(format!(
                "Invalid phone number: '{phone}'"
            )));
        }
    }

    if !is_valid_card(card_number) {
        return Err(LedgerError::validation(
            "Card number must be exactly 16 digits",
        ));
    }

    account.password_hash = Some(hash_password(password));
    account.phone_number = phone.map(str::to_string);
    account.card_number = Some(card_number.to_string());
    Ok(account)
}

pub fn new_category(name: &str, op_type: OperationType) -> LedgerResult<Category> {
    validate_name(name, "Category name")?;

    Ok(Category {
        id: Uuid::new_v4(),
        name: name.to_string(),
        op_type,
    })
}

pub fn new_operation(
    op_type: OperationType,
    account_id: Uuid,
    amount: Decimal,
    date: NaiveDateTime,
    description: Option<&str>,
    category_id: Uuid,
) -> LedgerResult<Operation> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation("Amount must be greater than zero"));
    }

    let description = description.map(str::trim).filter(|d| !d.is_empty());

    Ok(Operation {
        id: Uuid::new_v4(),
        op_type,
        account_id,
        amount,
        date,
        description: description.map(str::to_string),
        category_id,
    })
}

pub(crate) fn validate_name(name: &str, what: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::validation(format!("{what} cannot be empty")));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(LedgerError::validation(format!(
            "{what} is too long (max {MAX_NAME_LEN} characters)"
        )));
    }
    Ok(())
}

/// Optional leading '+', then 10 to 15 digits.
fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_valid_card(card: &str) -> bool {
    card.len() == 16 && card.chars().all(|c| c.is_ascii_digit())
}

pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}
