//! Fixed-point reward arithmetic.
//!
//! All functions are integer-only. Every product is formed in a wider type
//! before the single division, so rounding happens exactly once and always
//! toward zero. Results are narrowed back with an explicit overflow check.

use primitive_types::{U256, U512};

use crate::constants::PRECISION;
use crate::error::MathError;
use crate::types::Amount;

fn wide(v: U256) -> U512 {
    U512::from(v)
}

/// Narrow a 512-bit intermediate back to 256 bits.
pub fn narrow_u256(v: U512) -> Result<U256, MathError> {
    U256::try_from(v).map_err(|_| MathError::Overflow)
}

/// Narrow a 256-bit value to a token amount.
pub fn narrow_amount(v: U256) -> Result<Amount, MathError> {
    u128::try_from(v).map_err(|_| MathError::Overflow)
}

/// Clamp a 256-bit value into the amount range.
pub fn saturating_amount(v: U256) -> Amount {
    narrow_amount(v).unwrap_or(Amount::MAX)
}

/// Growth of the reward-per-unit accumulator over `elapsed` seconds.
///
/// ```text
/// Δrpu = PRECISION × rate × elapsed / total_staked
/// ```
///
/// Errors with [`MathError::DivisionByZero`] when nothing is staked; callers
/// skip the accrual entirely in that case.
pub fn accrual_delta(rate: Amount, elapsed: u64, total_staked: Amount) -> Result<U256, MathError> {
    if total_staked == 0 {
        return Err(MathError::DivisionByZero);
    }
    let numerator = U512::from(PRECISION)
        .checked_mul(U512::from(rate))
        .and_then(|v| v.checked_mul(U512::from(elapsed)))
        .ok_or(MathError::Overflow)?;
    narrow_u256(numerator / U512::from(total_staked))
}

/// Rewards a balance has earned while the accumulator grew by `rpu_delta`.
///
/// ```text
/// earned = balance × Δrpu / PRECISION
/// ```
pub fn accrued_rewards(balance: Amount, rpu_delta: U256) -> Result<Amount, MathError> {
    let product = U512::from(balance)
        .checked_mul(wide(rpu_delta))
        .ok_or(MathError::Overflow)?;
    narrow_amount(narrow_u256(product / U512::from(PRECISION))?)
}

/// Reward units still owed by a running period: `remaining × rate`.
pub fn leftover_rewards(remaining: u64, rate: Amount) -> U256 {
    // u64 × u128 always fits in 256 bits.
    U256::from(remaining) * U256::from(rate)
}

/// Per-second rate that spreads `total` over `duration` seconds, rounded down.
pub fn rate_over(total: U512, duration: u64) -> Result<Amount, MathError> {
    if duration == 0 {
        return Err(MathError::DivisionByZero);
    }
    narrow_amount(narrow_u256(total / U512::from(duration))?)
}

/// `rate × duration` without leaving 256 bits.
pub fn committed_rewards(rate: Amount, duration: u64) -> U256 {
    U256::from(rate) * U256::from(duration)
}

/// `a + b` in 512 bits.
pub fn sum(a: Amount, b: U256) -> U512 {
    U512::from(a) + wide(b)
}

/// `a × b` in 512 bits.
pub fn product(a: Amount, b: U256) -> Result<U512, MathError> {
    U512::from(a).checked_mul(wide(b)).ok_or(MathError::Overflow)
}
