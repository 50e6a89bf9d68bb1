//! In-memory token custody.
//!
//! [`InMemoryToken`] implements [`TokenAccount`] over a mutex-guarded balance
//! map. It backs the simulator and the test suites; holders can be frozen to
//! make transfers touching them fail, which exercises the ledger's rollback.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use drip_core::error::TokenError;
use drip_core::traits::TokenAccount;
use drip_core::types::{AccountId, Amount};

#[derive(Debug, Default)]
struct Balances {
    held: HashMap<AccountId, Amount>,
    frozen: HashSet<AccountId>,
    supply: Amount,
}

impl Balances {
    fn get(&self, holder: &AccountId) -> Amount {
        self.held.get(holder).copied().unwrap_or(0)
    }

    fn check_unfrozen(&self, holder: &AccountId) -> Result<(), TokenError> {
        if self.frozen.contains(holder) {
            return Err(TokenError::Rejected(format!("holder {holder} is frozen")));
        }
        Ok(())
    }

    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<(), TokenError> {
        self.check_unfrozen(from)?;
        self.check_unfrozen(to)?;
        let have = self.get(from);
        let remaining = have
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientBalance { holder: *from, have, need: amount })?;
        if from == to {
            return Ok(());
        }
        let credited = self
            .get(to)
            .checked_add(amount)
            .ok_or(TokenError::BalanceOverflow(*to))?;
        self.held.insert(*from, remaining);
        self.held.insert(*to, credited);
        Ok(())
    }
}

/// A fungible token whose pool custody lives at `custody`.
#[derive(Debug)]
pub struct InMemoryToken {
    custody: AccountId,
    balances: Mutex<Balances>,
}

impl InMemoryToken {
    pub fn new(custody: AccountId) -> Self {
        Self {
            custody,
            balances: Mutex::new(Balances::default()),
        }
    }

    /// Create `amount` new tokens for `holder`.
    pub fn mint(&self, holder: &AccountId, amount: Amount) -> Result<(), TokenError> {
        let mut balances = self.balances.lock();
        let supply = balances
            .supply
            .checked_add(amount)
            .ok_or(TokenError::BalanceOverflow(*holder))?;
        let credited = balances
            .get(holder)
            .checked_add(amount)
            .ok_or(TokenError::BalanceOverflow(*holder))?;
        balances.held.insert(*holder, credited);
        balances.supply = supply;
        Ok(())
    }

    /// Move tokens between two holders directly, outside pool custody.
    pub fn transfer(&self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<(), TokenError> {
        self.balances.lock().transfer(from, to, amount)
    }

    /// Make every transfer touching `holder` fail until unfrozen.
    pub fn set_frozen(&self, holder: &AccountId, frozen: bool) {
        let mut balances = self.balances.lock();
        if frozen {
            balances.frozen.insert(*holder);
        } else {
            balances.frozen.remove(holder);
        }
    }

    /// Total tokens ever minted.
    pub fn total_supply(&self) -> Amount {
        self.balances.lock().supply
    }

    /// Tokens currently held in pool custody.
    pub fn custody_balance(&self) -> Amount {
        self.balances.lock().get(&self.custody)
    }
}

impl TokenAccount for InMemoryToken {
    fn transfer_in(&self, from: &AccountId, amount: Amount) -> Result<(), TokenError> {
        self.balances.lock().transfer(from, &self.custody, amount)
    }

    fn transfer_out(&self, to: &AccountId, amount: Amount) -> Result<(), TokenError> {
        self.balances.lock().transfer(&self.custody, to, amount)
    }

    fn balance_of(&self, holder: &AccountId) -> Result<Amount, TokenError> {
        Ok(self.balances.lock().get(holder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(label: &str) -> AccountId {
        AccountId::from_label(label)
    }

    #[test]
    fn mint_and_custody_round_trip() {
        let token = InMemoryToken::new(id("pool"));
        token.mint(&id("alice"), 100).unwrap();
        token.transfer_in(&id("alice"), 60).unwrap();
        assert_eq!(token.balance_of(&id("alice")).unwrap(), 40);
        assert_eq!(token.custody_balance(), 60);
        token.transfer_out(&id("bob"), 25).unwrap();
        assert_eq!(token.balance_of(&id("bob")).unwrap(), 25);
        assert_eq!(token.custody_balance(), 35);
        assert_eq!(token.total_supply(), 100);
    }

    #[test]
    fn overdraft_is_rejected_without_effect() {
        let token = InMemoryToken::new(id("pool"));
        token.mint(&id("alice"), 5).unwrap();
        let err = token.transfer_in(&id("alice"), 6).unwrap_err();
        assert_eq!(
            err,
            TokenError::InsufficientBalance { holder: id("alice"), have: 5, need: 6 }
        );
        assert_eq!(token.balance_of(&id("alice")).unwrap(), 5);
        assert_eq!(token.custody_balance(), 0);
    }

    #[test]
    fn frozen_holder_cannot_send_or_receive() {
        let token = InMemoryToken::new(id("pool"));
        token.mint(&id("pool"), 10).unwrap();
        token.set_frozen(&id("alice"), true);
        assert!(matches!(
            token.transfer_out(&id("alice"), 1),
            Err(TokenError::Rejected(_))
        ));
        token.set_frozen(&id("alice"), false);
        token.transfer_out(&id("alice"), 1).unwrap();
        assert_eq!(token.balance_of(&id("alice")).unwrap(), 1);
    }

    #[test]
    fn mint_overflow_is_rejected() {
        let token = InMemoryToken::new(id("pool"));
        token.mint(&id("alice"), Amount::MAX).unwrap();
        assert_eq!(
            token.mint(&id("bob"), 1),
            Err(TokenError::BalanceOverflow(id("bob")))
        );
        assert_eq!(token.balance_of(&id("bob")).unwrap(), 0);
    }

    #[test]
    fn self_transfer_is_a_no_op() {
        let token = InMemoryToken::new(id("pool"));
        token.mint(&id("alice"), 3).unwrap();
        token.transfer(&id("alice"), &id("alice"), 3).unwrap();
        assert_eq!(token.balance_of(&id("alice")).unwrap(), 3);
    }
}
