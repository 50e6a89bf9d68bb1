//! Error types for the Drip ledger.
use thiserror::Error;

use crate::types::{AccountId, Amount, Timestamp};

/// Failure reported by a [`TokenAccount`](crate::traits::TokenAccount) collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("insufficient token balance for {holder}: have {have}, need {need}")] InsufficientBalance { holder: AccountId, have: Amount, need: Amount },
    #[error("token balance overflow for {0}")] BalanceOverflow(AccountId),
    #[error("transfer rejected: {0}")] Rejected(String),
}

/// Fixed-point arithmetic failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("arithmetic overflow")] Overflow,
    #[error("division by zero")] DivisionByZero,
}

/// Every way a ledger operation can be rejected.
///
/// A rejected operation never leaves a partial effect behind: the accumulator
/// and every account are exactly as they were before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("amount must be greater than zero")] ZeroAmount,
    #[error("insufficient staked balance: requested {requested}, available {available}")] InsufficientBalance { requested: Amount, available: Amount },
    #[error("insufficient reward funds: required {required}, available {available}")] InsufficientFunds { required: Amount, available: Amount },
    #[error("caller {0} is not authorized to fund the pool")] Unauthorized(AccountId),
    #[error("clock moved backwards: now {now} < last observed {last}")] ClockRegression { now: Timestamp, last: Timestamp },
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("token transfer failed: {0}")] Token(#[from] TokenError),
}

impl From<MathError> for LedgerError {
    fn from(_: MathError) -> Self {
        // Ledger paths divide only by a nonzero total_staked or a validated
        // duration. Callers planning from raw input must check the divisor.
        LedgerError::ArithmeticOverflow
    }
}

/// Invalid pool configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("reward duration must be greater than zero")] ZeroDuration,
    #[error("config load: {0}")] Load(String),
}
