//! Core ledger types: account identities, per-account records and pool snapshots.

use std::fmt;
use std::str::FromStr;

use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Raw token amount in base units.
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// 32-byte participant identity. Serialized as a 64-character hex string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// Derive a stable identity from a human-readable label (BLAKE3 of the label).
    ///
    /// Used by simulations and tests to address participants by name.
    pub fn from_label(label: &str) -> Self {
        Self(*blake3::hash(label.as_bytes()).as_bytes())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for AccountId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.trim_start_matches("0x"), &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// How unspent rewards of a still-running period are folded into a new funding.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RolloverPolicy {
    /// `new_rate = (amount + leftover) / duration`. Leftover rewards are carried over unchanged.
    #[default]
    Additive,
    /// `new_rate = (amount * leftover) / duration`.
    ///
    /// Kept for compatibility with existing deployments. The product scales
    /// the new amount by the leftover instead of adding the two.
    Multiplicative,
}

/// Per-participant record. Created on first touch and never removed.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct StakerAccount {
    /// Currently staked amount.
    pub balance: Amount,
    /// Accumulator value at this account's last settlement.
    pub reward_per_unit_paid: U256,
    /// Rewards earned and credited but not yet paid out.
    pub settled_rewards: Amount,
}

/// Point-in-time copy of the pool-level accumulator.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub total_staked: Amount,
    pub reward_rate: Amount,
    pub reward_per_unit_stored: U256,
    pub last_accrual_time: Timestamp,
    pub period_end: Timestamp,
    /// Length of every funding period in seconds.
    pub reward_duration: u64,
    /// `reward_rate * reward_duration`: what a full period distributes at the current rate.
    pub reward_for_duration: Amount,
}
