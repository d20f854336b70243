pub mod balance;
pub mod error;
pub mod schemas;
pub mod settlement;

pub use balance::{compute_balances, BalanceMap, MemberBalance};
pub use error::SettlementError;
pub use settlement::{plan_transactions, settle_trip, EPSILON};
