use rust_decimal::Decimal;
use thiserror::Error;

/// Errors the engine can surface. Both signal bad input from the caller, never
/// a transient failure, so neither is worth retrying.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SettlementError {
    #[error("invalid expense: {0}")]
    InvalidExpense(String),
    #[error("balances do not settle: they sum to {0} instead of 0")]
    InconsistentBalances(Decimal),
}
