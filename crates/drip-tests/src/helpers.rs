//! Shared fixtures for scenario and property tests.

use std::sync::Arc;

use drip_core::constants::COIN;
use drip_core::error::LedgerError;
use drip_core::traits::{Owner, TokenAccount};
use drip_core::types::{AccountId, Amount, RolloverPolicy, Timestamp};
use drip_ledger::{FundingPlan, InMemoryToken, Ledger, PoolConfig};

/// A fixed, plausible start time (2023-11-14).
pub const T0: Timestamp = 1_700_000_000;

/// Stake tokens every named participant starts with.
pub const STARTING_STAKE: Amount = 1_000_000 * COIN;

pub type MemLedger = Ledger<Arc<InMemoryToken>, Arc<InMemoryToken>, Owner>;

/// Deterministic account id for a readable name.
pub fn acct(name: &str) -> AccountId {
    AccountId::from_label(name)
}

/// The identity allowed to fund test pools.
pub fn owner() -> AccountId {
    acct("owner")
}

/// A ledger plus handles on both of its tokens.
pub struct Fixture {
    pub ledger: MemLedger,
    pub stake: Arc<InMemoryToken>,
    pub reward: Arc<InMemoryToken>,
}

impl Fixture {
    /// Empty pool whose participants `names` each hold [`STARTING_STAKE`].
    pub fn new(policy: RolloverPolicy, names: &[&str]) -> Self {
        let config = PoolConfig {
            rollover: policy,
            ..PoolConfig::default()
        };
        let stake = Arc::new(InMemoryToken::new(config.custody));
        let reward = Arc::new(InMemoryToken::new(config.custody));
        for name in names {
            stake.mint(&acct(name), STARTING_STAKE).unwrap();
        }
        let ledger = Ledger::new(config, Arc::clone(&stake), Arc::clone(&reward), Owner(owner())).unwrap();
        Self { ledger, stake, reward }
    }

    /// Mint `amount` of reward into custody and fund a period with it.
    pub fn fund(&mut self, amount: Amount, now: Timestamp) -> Result<FundingPlan, LedgerError> {
        self.reward.mint(&self.ledger.config().custody, amount).unwrap();
        self.ledger.fund_new_period(owner(), amount, now)
    }

    /// Reward tokens paid out to participants so far.
    pub fn paid_out(&self, names: &[&str]) -> Amount {
        names
            .iter()
            .map(|n| self.reward.balance_of(&acct(n)).unwrap_or(0))
            .sum()
    }
}
