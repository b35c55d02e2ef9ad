use crate::domain::OperationType;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Domain error taxonomy. Facade calls return this so the CLI boundary can
/// render a single human-readable line without inspecting the call site.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed input, rejected before any mutation.
    #[error("{0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("category '{name}' is not an {expected} category")]
    CategoryTypeMismatch {
        name: String,
        expected: OperationType,
    },

    #[error("insufficient funds: balance is {balance}, requested {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("invalid stored value: {0}")]
    Corrupt(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        LedgerError::Validation(msg.into())
    }

    pub fn account_not_found(id: Uuid) -> Self {
        LedgerError::NotFound { kind: "Account", id }
    }

    pub fn category_not_found(id: Uuid) -> Self {
        LedgerError::NotFound { kind: "Category", id }
    }

    pub fn operation_not_found(id: Uuid) -> Self {
        LedgerError::NotFound { kind: "Operation", id }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
