//! Pool configuration.
//!
//! Provides [`PoolConfig`] with defaults for the funding period length, the
//! rollover policy and the custody identity. Configuration is loaded from an
//! optional TOML file overlaid with `DRIP_`-prefixed environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use drip_core::constants::DEFAULT_REWARD_DURATION;
use drip_core::error::ConfigError;
use drip_core::types::{AccountId, RolloverPolicy};

/// Label the default custody identity is derived from.
pub const DEFAULT_CUSTODY_LABEL: &str = "drip-pool-custody";

/// Parameters fixed for the lifetime of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Length of every funding period in seconds.
    pub reward_duration: u64,
    /// How unspent rewards are folded into a new funding.
    pub rollover: RolloverPolicy,
    /// Holder identity of pool custody on both token accounts.
    pub custody: AccountId,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            reward_duration: DEFAULT_REWARD_DURATION,
            rollover: RolloverPolicy::default(),
            custody: AccountId::from_label(DEFAULT_CUSTODY_LABEL),
        }
    }
}

impl PoolConfig {
    /// Reject configurations no pool can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reward_duration == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        Ok(())
    }

    /// Load from `path` (if it exists) and the environment, then validate.
    ///
    /// Environment keys: `DRIP_REWARD_DURATION`, `DRIP_ROLLOVER`, `DRIP_CUSTODY`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let cfg: PoolConfig = builder
            .add_source(config::Environment::with_prefix("DRIP").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
