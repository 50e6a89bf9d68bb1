//! Per-account checkpoints and settlement.
//!
//! Each account remembers the accumulator value it was last settled against.
//! Settling folds `balance × (current − checkpoint) / PRECISION` into the
//! account's settled rewards and moves the checkpoint forward. An account must
//! be settled before its balance changes or its rewards are paid, otherwise the
//! stale checkpoint would be applied to the new balance.

use std::collections::HashMap;

use drip_core::U256;
use drip_core::error::MathError;
use drip_core::math;
use drip_core::types::{AccountId, Amount, StakerAccount};

/// Keyed table of participant records.
#[derive(Clone, Debug, Default)]
pub struct StakerLedger {
    accounts: HashMap<AccountId, StakerAccount>,
}

impl StakerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The account's record, or an empty one if it never staked.
    pub fn get(&self, account: &AccountId) -> StakerAccount {
        self.accounts.get(account).copied().unwrap_or_default()
    }

    /// The stored record, `None` if the account was never touched.
    pub fn record(&self, account: &AccountId) -> Option<StakerAccount> {
        self.accounts.get(account).copied()
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.get(account).balance
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &StakerAccount)> {
        self.accounts.iter()
    }

    /// Settled plus pending rewards against `reward_per_unit`, without mutating.
    pub fn earned(&self, account: &AccountId, reward_per_unit: U256) -> Result<Amount, MathError> {
        let record = self.get(account);
        let pending = math::accrued_rewards(
            record.balance,
            reward_per_unit.saturating_sub(record.reward_per_unit_paid),
        )?;
        record
            .settled_rewards
            .checked_add(pending)
            .ok_or(MathError::Overflow)
    }

    /// Fold pending rewards into `settled_rewards` and checkpoint the account.
    ///
    /// Returns the amount newly settled. Accounts that were never touched
    /// have nothing to settle and are not created.
    pub fn settle(&mut self, account: &AccountId, reward_per_unit: U256) -> Result<Amount, MathError> {
        let Some(prior) = self.record(account) else {
            return Ok(0);
        };
        let earned = self.earned(account, reward_per_unit)?;
        self.accounts.insert(
            *account,
            StakerAccount {
                reward_per_unit_paid: reward_per_unit,
                settled_rewards: earned,
                ..prior
            },
        );
        Ok(earned - prior.settled_rewards)
    }

    /// Add to an account's balance, creating the record on first stake.
    ///
    /// A new record is checkpointed at `reward_per_unit` so it earns nothing
    /// from before it existed.
    pub fn credit(
        &mut self,
        account: &AccountId,
        amount: Amount,
        reward_per_unit: U256,
    ) -> Result<(), MathError> {
        let record = self.accounts.entry(*account).or_insert_with(|| StakerAccount {
            reward_per_unit_paid: reward_per_unit,
            ..StakerAccount::default()
        });
        record.balance = record
            .balance
            .checked_add(amount)
            .ok_or(MathError::Overflow)?;
        Ok(())
    }

    pub fn debit(&mut self, account: &AccountId, amount: Amount) -> Result<(), MathError> {
        if amount == 0 {
            return Ok(());
        }
        let record = self.accounts.get_mut(account).ok_or(MathError::Overflow)?;
        record.balance = record
            .balance
            .checked_sub(amount)
            .ok_or(MathError::Overflow)?;
        Ok(())
    }

    /// Zero the account's settled rewards and return what they were.
    pub fn take_rewards(&mut self, account: &AccountId) -> Amount {
        self.accounts
            .get_mut(account)
            .map(|record| std::mem::take(&mut record.settled_rewards))
            .unwrap_or(0)
    }

    /// Put a record back exactly as captured by [`record`](Self::record).
    pub fn restore(&mut self, account: &AccountId, prior: Option<StakerAccount>) {
        match prior {
            Some(record) => {
                self.accounts.insert(*account, record);
            }
            None => {
                self.accounts.remove(account);
            }
        }
    }

    /// Sum of all balances. O(n); used for audits, never on operation paths.
    pub fn total_balance(&self) -> Amount {
        self.accounts.values().map(|r| r.balance).sum()
    }

    /// Sum of all settled, unpaid rewards. O(n).
    pub fn total_settled(&self) -> Amount {
        self.accounts.values().map(|r| r.settled_rewards).sum()
    }
}
