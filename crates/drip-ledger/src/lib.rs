//! # drip-ledger: Proportional reward-accrual ledger.
//!
//! A funder deposits a fixed amount of reward token for a fixed duration and
//! participants stake a separate token to earn a share of it proportional to
//! their stake and the time it was held. All bookkeeping is O(1) per
//! operation regardless of the number of participants:
//! - **Accumulator**: reward earned per unit staked since inception, advanced
//!   lazily on every interaction and clamped to the funded period.
//! - **Staker ledger**: per-account checkpoints settled before any balance
//!   change or payout.
//! - **Ledger**: the atomic aggregate driving both, plus token custody.
//! - **Pool**: a mutex-guarded ledger with its own clock for shared use.

pub mod accumulator;
pub mod clock;
pub mod config;
pub mod ledger;
pub mod memory;
pub mod pool;
pub mod staker;

pub use accumulator::{FundingPlan, PoolAccumulator};
pub use clock::{ManualClock, SystemClock};
pub use config::PoolConfig;
pub use ledger::Ledger;
pub use memory::InMemoryToken;
pub use pool::StakingPool;
pub use staker::StakerLedger;
