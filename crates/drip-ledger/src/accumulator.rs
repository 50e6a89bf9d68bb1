//! Pool-level reward-per-unit accumulator.
//!
//! The accumulator tracks how much reward one unit of stake has earned since
//! the pool was created. Any participant's earnings are then the difference
//! between the current value and the value at their last checkpoint, times
//! their balance, so no operation ever iterates over participants.
//!
//! The accumulator only advances up to `period_end`: past that point no
//! funded rewards back the rate, so elapsed wall-clock time is ignored until
//! a new period is funded.

use drip_core::U256;
use drip_core::error::{LedgerError, MathError};
use drip_core::math;
use drip_core::types::{Amount, PoolSnapshot, RolloverPolicy, Timestamp};

/// Outcome of a funding computation, not yet applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FundingPlan {
    /// Per-second rate for the new period.
    pub reward_rate: Amount,
    /// End of the new period.
    pub period_end: Timestamp,
    /// Reward units the new rate commits the pool to: `reward_rate × duration`.
    pub committed: U256,
    /// Unspent rewards of the previous period at funding time.
    pub leftover: U256,
}

/// Singleton pool state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PoolAccumulator {
    total_staked: Amount,
    reward_rate: Amount,
    reward_per_unit_stored: U256,
    last_accrual_time: Timestamp,
    period_end: Timestamp,
}

impl PoolAccumulator {
    /// An unfunded pool with nothing staked.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_staked(&self) -> Amount {
        self.total_staked
    }

    pub fn reward_rate(&self) -> Amount {
        self.reward_rate
    }

    pub fn reward_per_unit_stored(&self) -> U256 {
        self.reward_per_unit_stored
    }

    pub fn last_accrual_time(&self) -> Timestamp {
        self.last_accrual_time
    }

    pub fn period_end(&self) -> Timestamp {
        self.period_end
    }

    /// `min(now, period_end)`: the latest instant rewards can have accrued to.
    pub fn effective_time(&self, now: Timestamp) -> Timestamp {
        now.min(self.period_end)
    }

    /// Current accumulator value without mutating state.
    ///
    /// Returns the stored value unchanged while nothing is staked, so no
    /// division happens for an empty pool.
    pub fn reward_per_unit(&self, now: Timestamp) -> Result<U256, MathError> {
        if self.total_staked == 0 {
            return Ok(self.reward_per_unit_stored);
        }
        let elapsed = self
            .effective_time(now)
            .saturating_sub(self.last_accrual_time);
        if elapsed == 0 {
            return Ok(self.reward_per_unit_stored);
        }
        let delta = math::accrual_delta(self.reward_rate, elapsed, self.total_staked)?;
        self.reward_per_unit_stored
            .checked_add(delta)
            .ok_or(MathError::Overflow)
    }

    /// Bring the accumulator forward to `now` and return the new value.
    ///
    /// `last_accrual_time` moves to the effective time even when nothing is
    /// staked; an empty stretch is therefore never credited to whoever stakes
    /// next.
    pub fn advance(&mut self, now: Timestamp) -> Result<U256, MathError> {
        let rpu = self.reward_per_unit(now)?;
        self.reward_per_unit_stored = rpu;
        self.last_accrual_time = self.effective_time(now).max(self.last_accrual_time);
        Ok(rpu)
    }

    /// Compute the rate of a new funding period starting at `now`.
    ///
    /// Must run after [`advance`](Self::advance). Pure: nothing is committed
    /// until [`apply_funding`](Self::apply_funding), so the caller can still
    /// reject the plan (e.g. when custody does not cover `committed`).
    pub fn plan_funding(
        &self,
        amount: Amount,
        now: Timestamp,
        duration: u64,
        policy: RolloverPolicy,
    ) -> Result<FundingPlan, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let (total, leftover) = if now >= self.period_end {
            (math::sum(amount, U256::zero()), U256::zero())
        } else {
            let remaining = self.period_end - now;
            let leftover = math::leftover_rewards(remaining, self.reward_rate);
            let total = match policy {
                RolloverPolicy::Additive => math::sum(amount, leftover),
                RolloverPolicy::Multiplicative => math::product(amount, leftover)?,
            };
            (total, leftover)
        };

        let reward_rate = math::rate_over(total, duration)?;
        let period_end = now
            .checked_add(duration)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        Ok(FundingPlan {
            reward_rate,
            period_end,
            committed: math::committed_rewards(reward_rate, duration),
            leftover,
        })
    }

    /// Commit a funding plan: the new period starts at `now`.
    pub fn apply_funding(&mut self, plan: &FundingPlan, now: Timestamp) {
        self.reward_rate = plan.reward_rate;
        self.last_accrual_time = now;
        self.period_end = plan.period_end;
    }

    pub fn increase_stake(&mut self, amount: Amount) -> Result<(), MathError> {
        self.total_staked = self
            .total_staked
            .checked_add(amount)
            .ok_or(MathError::Overflow)?;
        Ok(())
    }

    pub fn decrease_stake(&mut self, amount: Amount) -> Result<(), MathError> {
        self.total_staked = self
            .total_staked
            .checked_sub(amount)
            .ok_or(MathError::Overflow)?;
        Ok(())
    }

    /// Rewards a full period distributes at the current rate.
    pub fn reward_for_duration(&self, duration: u64) -> Amount {
        math::saturating_amount(math::committed_rewards(self.reward_rate, duration))
    }

    pub fn snapshot(&self, duration: u64) -> PoolSnapshot {
        PoolSnapshot {
            total_staked: self.total_staked,
            reward_rate: self.reward_rate,
            reward_per_unit_stored: self.reward_per_unit_stored,
            last_accrual_time: self.last_accrual_time,
            period_end: self.period_end,
            reward_duration: duration,
            reward_for_duration: self.reward_for_duration(duration),
        }
    }
}
