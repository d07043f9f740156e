use rust_decimal::Decimal;

/// Closed taxonomy of ledger outcomes.
///
/// Everything except `Database` is an expected business result surfaced
/// directly to the caller; none of them are retried by the subsystem
/// itself. `Conflict` means this caller lost a concurrency race and is a
/// normal outcome, not a fault.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("this code has already been redeemed")]
    AlreadyRedeemed,
    #[error("this code has expired")]
    Expired,
    #[error("this user already has a referrer")]
    AlreadyReferred,
    #[error("order does not qualify for commission: {0}")]
    InvalidOrder(String),
    #[error("insufficient balance: {requested} requested, {available} available")]
    InsufficientBalance {
        available: Decimal,
        requested: Decimal,
    },
    #[error("invalid amount: {0}")]
    InvalidAmount(Decimal),
    #[error("code space exhausted after {0} generation rounds")]
    Generation(usize),
    #[error("lost a concurrent update, please retry")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl From<sea_orm::TransactionError<LedgerError>> for LedgerError {
    fn from(err: sea_orm::TransactionError<LedgerError>) -> Self {
        match err {
            sea_orm::TransactionError::Connection(db_err) => db_err.into(),
            sea_orm::TransactionError::Transaction(ledger_err) => ledger_err,
        }
    }
}

impl LedgerError {
    /// Whether the underlying database error was a unique constraint hit.
    /// Used to translate lost insert races into their business outcome.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            LedgerError::Database(db_err) => matches!(
                db_err.sql_err(),
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
            ),
            _ => false,
        }
    }
}
