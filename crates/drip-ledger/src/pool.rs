//! Thread-safe pool facade.
//!
//! [`StakingPool`] owns a [`Ledger`] behind a `parking_lot::Mutex` together
//! with a [`Clock`]. Every operation takes the lock, reads the clock once
//! while holding it, and runs to completion, so operations are serialized and
//! their timestamps are ordered the same way they were applied.

use parking_lot::Mutex;

use drip_core::U256;
use drip_core::error::{ConfigError, LedgerError};
use drip_core::traits::{Authority, Clock, TokenAccount};
use drip_core::types::{AccountId, Amount, PoolSnapshot, StakerAccount, Timestamp};

use crate::accumulator::FundingPlan;
use crate::config::PoolConfig;
use crate::ledger::Ledger;

/// A staking pool shared between threads.
pub struct StakingPool<S, R, A, C> {
    ledger: Mutex<Ledger<S, R, A>>,
    clock: C,
}

impl<S, R, A, C> StakingPool<S, R, A, C>
where
    S: TokenAccount,
    R: TokenAccount,
    A: Authority,
    C: Clock,
{
    pub fn new(config: PoolConfig, stake_token: S, reward_token: R, authority: A, clock: C) -> Result<Self, ConfigError> {
        Ok(Self {
            ledger: Mutex::new(Ledger::new(config, stake_token, reward_token, authority)?),
            clock,
        })
    }

    pub fn stake(&self, account: AccountId, amount: Amount) -> Result<(), LedgerError> {
        let mut ledger = self.ledger.lock();
        let now = self.clock.now();
        ledger.stake(account, amount, now)
    }

    pub fn withdraw(&self, account: AccountId, amount: Amount) -> Result<(), LedgerError> {
        let mut ledger = self.ledger.lock();
        let now = self.clock.now();
        ledger.withdraw(account, amount, now)
    }

    pub fn claim_rewards(&self, account: AccountId) -> Result<Amount, LedgerError> {
        let mut ledger = self.ledger.lock();
        let now = self.clock.now();
        ledger.claim_rewards(account, now)
    }

    pub fn exit(&self, account: AccountId) -> Result<(Amount, Amount), LedgerError> {
        let mut ledger = self.ledger.lock();
        let now = self.clock.now();
        ledger.exit(account, now)
    }

    pub fn fund_new_period(&self, caller: AccountId, amount: Amount) -> Result<FundingPlan, LedgerError> {
        let mut ledger = self.ledger.lock();
        let now = self.clock.now();
        ledger.fund_new_period(caller, amount, now)
    }

    pub fn earned(&self, account: &AccountId) -> Result<Amount, LedgerError> {
        let ledger = self.ledger.lock();
        ledger.earned(account, self.clock.now())
    }

    pub fn reward_per_unit(&self) -> Result<U256, LedgerError> {
        let ledger = self.ledger.lock();
        ledger.reward_per_unit(self.clock.now())
    }

    pub fn last_time_reward_applicable(&self) -> Timestamp {
        let ledger = self.ledger.lock();
        ledger.last_time_reward_applicable(self.clock.now())
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.ledger.lock().balance_of(account)
    }

    pub fn account(&self, account: &AccountId) -> StakerAccount {
        self.ledger.lock().account(account)
    }

    pub fn total_staked(&self) -> Amount {
        self.ledger.lock().total_staked()
    }

    pub fn reward_for_duration(&self) -> Amount {
        self.ledger.lock().reward_for_duration()
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        self.ledger.lock().snapshot()
    }

    /// Run `f` against the ledger with the lock held.
    pub fn with_ledger<T>(&self, f: impl FnOnce(&Ledger<S, R, A>) -> T) -> T {
        f(&self.ledger.lock())
    }
}
