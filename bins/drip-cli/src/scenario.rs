//! Scenario replay against an in-memory pool.
//!
//! A scenario names its participants by label, gives each a starting stake
//! token balance, and lists timed steps. Steps run in order on a
//! [`StakingPool`] driven by a [`ManualClock`]; a failing step is recorded in
//! the report and the run continues.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use drip_core::error::LedgerError;
use drip_core::traits::{Clock, Owner, TokenAccount};
use drip_core::types::{AccountId, Amount, PoolSnapshot, Timestamp};
use drip_ledger::{InMemoryToken, ManualClock, PoolConfig, StakingPool};

/// Label of the funding authority unless a scenario overrides it.
pub const DEFAULT_FUNDER: &str = "owner";

type MemPool = StakingPool<Arc<InMemoryToken>, Arc<InMemoryToken>, Owner, Arc<ManualClock>>;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Unix time of offset zero.
    pub start: Timestamp,
    /// Funding authority label.
    #[serde(default = "default_funder")]
    pub funder: String,
    /// Starting stake-token balance per participant.
    #[serde(default)]
    pub holders: BTreeMap<String, Amount>,
    pub steps: Vec<Step>,
}

fn default_funder() -> String {
    DEFAULT_FUNDER.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Seconds after `start`.
    pub at: u64,
    pub action: Action,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Mint `amount` reward to the caller, move it into custody and fund a
    /// period with it. A rejected funding hands the tokens back to the caller.
    Fund { amount: Amount, caller: Option<String> },
    Stake { account: String, amount: Amount },
    Withdraw { account: String, amount: Amount },
    Claim { account: String },
    Exit { account: String },
}

#[derive(Debug, Serialize)]
pub struct StepReport {
    pub time: Timestamp,
    pub action: Action,
    /// Rewards paid out by the step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid: Option<Amount>,
    /// Staked principal returned by the step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawn: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AccountReport {
    pub id: AccountId,
    pub staked: Amount,
    pub settled_rewards: Amount,
    pub earned: Amount,
    pub rewards_received: Amount,
    pub stake_token_held: Amount,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub end_time: Timestamp,
    pub steps: Vec<StepReport>,
    pub accounts: BTreeMap<String, AccountReport>,
    pub pool: PoolSnapshot,
    pub reward_custody: Amount,
    /// Sum of accepted fundings.
    pub reward_funded: Amount,
}

/// Token movements of one successful step.
#[derive(Debug, Default, Clone, Copy)]
struct Outcome {
    paid: Option<Amount>,
    withdrawn: Option<Amount>,
    funded: Amount,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario: {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid scenario: {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(raw)?;
        ensure!(
            scenario.steps.windows(2).all(|w| w[0].at <= w[1].at),
            "steps must be ordered by time"
        );
        Ok(scenario)
    }

    /// Replay every step and report the final state.
    pub fn run(&self, config: PoolConfig) -> Result<Report> {
        let custody = config.custody;
        let stake = Arc::new(InMemoryToken::new(custody));
        let reward = Arc::new(InMemoryToken::new(custody));
        let clock = Arc::new(ManualClock::new(self.start));
        for (name, amount) in &self.holders {
            stake
                .mint(&AccountId::from_label(name), *amount)
                .with_context(|| format!("Failed to mint starting balance for {name}"))?;
        }

        let funder = AccountId::from_label(&self.funder);
        let pool: MemPool = StakingPool::new(
            config,
            Arc::clone(&stake),
            Arc::clone(&reward),
            Owner(funder),
            Arc::clone(&clock),
        )
        .context("Invalid pool configuration")?;

        info!(steps = self.steps.len(), participants = self.holders.len(), "replaying scenario");
        let mut steps = Vec::with_capacity(self.steps.len());
        let mut funded: Amount = 0;
        for step in &self.steps {
            let time = self
                .start
                .checked_add(step.at)
                .context("step time overflows")?;
            clock.set(time);
            let (outcome, error) = match Self::apply(&pool, &reward, custody, funder, &step.action) {
                Ok(outcome) => (outcome, None),
                Err(e) => {
                    debug!(time, "step failed: {e}");
                    (Outcome::default(), Some(e.to_string()))
                }
            };
            funded = funded.saturating_add(outcome.funded);
            steps.push(StepReport {
                time,
                action: step.action.clone(),
                paid: outcome.paid,
                withdrawn: outcome.withdrawn,
                error,
            });
        }

        let mut names: Vec<&String> = self.holders.keys().collect();
        for step in &self.steps {
            if let Some(name) = step.action.account() {
                names.push(name);
            }
        }
        names.sort();
        names.dedup();

        let mut accounts = BTreeMap::new();
        for name in names {
            let id = AccountId::from_label(name);
            let record = pool.account(&id);
            accounts.insert(
                name.clone(),
                AccountReport {
                    id,
                    staked: record.balance,
                    settled_rewards: record.settled_rewards,
                    earned: pool.earned(&id)?,
                    rewards_received: reward.balance_of(&id)?,
                    stake_token_held: stake.balance_of(&id)?,
                },
            );
        }

        Ok(Report {
            end_time: clock.now(),
            steps,
            accounts,
            pool: pool.snapshot(),
            reward_custody: reward.custody_balance(),
            reward_funded: funded,
        })
    }

    /// Run one action. A failed action leaves every balance as it was.
    fn apply(
        pool: &MemPool,
        reward: &InMemoryToken,
        custody: AccountId,
        funder: AccountId,
        action: &Action,
    ) -> Result<Outcome, LedgerError> {
        match action {
            Action::Fund { amount, caller } => {
                let caller = caller.as_deref().map_or(funder, AccountId::from_label);
                reward.mint(&caller, *amount)?;
                reward.transfer(&caller, &custody, *amount)?;
                if let Err(e) = pool.fund_new_period(caller, *amount) {
                    if let Err(undo) = reward.transfer(&custody, &caller, *amount) {
                        error!(%caller, amount = %amount, "failed to return rejected funding: {undo}");
                    }
                    return Err(e);
                }
                Ok(Outcome { funded: *amount, ..Outcome::default() })
            }
            Action::Stake { account, amount } => {
                pool.stake(AccountId::from_label(account), *amount)?;
                Ok(Outcome::default())
            }
            Action::Withdraw { account, amount } => {
                pool.withdraw(AccountId::from_label(account), *amount)?;
                Ok(Outcome { withdrawn: Some(*amount), ..Outcome::default() })
            }
            Action::Claim { account } => {
                let claimed = pool.claim_rewards(AccountId::from_label(account))?;
                Ok(Outcome { paid: Some(claimed), ..Outcome::default() })
            }
            Action::Exit { account } => {
                let (withdrawn, claimed) = pool.exit(AccountId::from_label(account))?;
                Ok(Outcome { paid: Some(claimed), withdrawn: Some(withdrawn), funded: 0 })
            }
        }
    }
}

impl Action {
    fn account(&self) -> Option<&String> {
        match self {
            Action::Fund { .. } => None,
            Action::Stake { account, .. }
            | Action::Withdraw { account, .. }
            | Action::Claim { account }
            | Action::Exit { account } => Some(account),
        }
    }
}
