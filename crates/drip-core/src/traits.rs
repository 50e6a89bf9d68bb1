//! Trait interfaces for the collaborators the ledger depends on.
//!
//! - [`TokenAccount`]: custody of one asset (stake or reward)
//! - [`Authority`]: who may fund a new reward period
//! - [`Clock`]: the time source every operation reads once
//!
//! The ledger never assumes a collaborator call succeeds: any error aborts
//! the enclosing operation and rolls the ledger back.

use crate::error::TokenError;
use crate::types::{AccountId, Amount, Timestamp};

/// Custody of a single fungible asset on behalf of the pool.
///
/// `transfer_in` moves tokens from a participant into pool custody,
/// `transfer_out` releases custody tokens to a participant. Implementations
/// use interior mutability so the ledger can hold them by value.
pub trait TokenAccount: Send + Sync {
    /// Pull `amount` from `from` into pool custody.
    fn transfer_in(&self, from: &AccountId, amount: Amount) -> Result<(), TokenError>;

    /// Release `amount` from pool custody to `to`.
    fn transfer_out(&self, to: &AccountId, amount: Amount) -> Result<(), TokenError>;

    /// Current balance of `holder`.
    fn balance_of(&self, holder: &AccountId) -> Result<Amount, TokenError>;
}

/// Funding authority check.
pub trait Authority: Send + Sync {
    fn is_authorized(&self, caller: &AccountId) -> bool;
}

/// Single-owner authority: exactly one identity may fund the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Owner(pub AccountId);

impl Authority for Owner {
    fn is_authorized(&self, caller: &AccountId) -> bool {
        *caller == self.0
    }
}

/// Time source in unix seconds.
///
/// Must be non-decreasing for the lifetime of a pool; the ledger rejects any
/// operation stamped earlier than one it has already applied.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

impl<T: TokenAccount + ?Sized> TokenAccount for std::sync::Arc<T> {
    fn transfer_in(&self, from: &AccountId, amount: Amount) -> Result<(), TokenError> {
        (**self).transfer_in(from, amount)
    }

    fn transfer_out(&self, to: &AccountId, amount: Amount) -> Result<(), TokenError> {
        (**self).transfer_out(to, amount)
    }

    fn balance_of(&self, holder: &AccountId) -> Result<Amount, TokenError> {
        (**self).balance_of(holder)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
