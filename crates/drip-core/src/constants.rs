//! Ledger constants. Token amounts are raw base units of the respective asset.

/// Fixed-point scale of the reward-per-unit accumulator (10^30).
///
/// Chosen over 10^18 so that `rate / total_staked` does not truncate to zero
/// for pools whose stake vastly outweighs the per-second emission. 10^30
/// still fits a `u128`; the products it takes part in are widened to 512
/// bits before division.
pub const PRECISION: u128 = 1_000_000_000_000_000_000_000_000_000_000;

/// One whole token with 18 decimals.
pub const COIN: u128 = 1_000_000_000_000_000_000;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Default funding period length: seven days.
pub const DEFAULT_REWARD_DURATION: u64 = 7 * SECONDS_PER_DAY;
