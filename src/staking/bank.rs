// Bank - Collaborateur externe qui détient réellement les tokens
// Principe: Le staking ne tient que des registres comptables, jamais de fonds
use crate::types::{AccountId, Balance};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Module pools holding bonded stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PoolKind {
    /// Tokens of validators in the active set
    Bonded,
    /// Tokens of unbonded/unbonding validators and of unbonding entries
    NotBonded,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PoolKind::Bonded => write!(f, "bonded_pool"),
            PoolKind::NotBonded => write!(f, "not_bonded_pool"),
        }
    }
}

/// Token movements the staking ledger needs from the bank.
///
/// Every method is all-or-nothing: on error no balance has changed.
pub trait BankKeeper {
    fn spendable_balance(&self, account: &AccountId) -> Balance;

    fn pool_balance(&self, pool: PoolKind) -> Balance;

    /// Spendable balance -> pool (delegate, create validator)
    fn delegate_coins_to_pool(
        &mut self,
        from: &AccountId,
        pool: PoolKind,
        amount: Balance,
    ) -> Result<(), BankError>;

    /// Pool -> spendable balance (matured unbonding)
    fn undelegate_coins_from_pool(
        &mut self,
        pool: PoolKind,
        to: &AccountId,
        amount: Balance,
    ) -> Result<(), BankError>;

    fn transfer_between_pools(
        &mut self,
        from: PoolKind,
        to: PoolKind,
        amount: Balance,
    ) -> Result<(), BankError>;

    /// Destroys slashed tokens.
    fn burn_from_pool(&mut self, pool: PoolKind, amount: Balance) -> Result<(), BankError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BankError {
    #[error("account {account} holds {available}, needs {needed}")]
    InsufficientAccountBalance {
        account: AccountId,
        needed: Balance,
        available: Balance,
    },

    #[error("{pool} holds {available}, needs {needed}")]
    InsufficientPoolBalance {
        pool: PoolKind,
        needed: Balance,
        available: Balance,
    },

    #[error("balance overflow")]
    Overflow,
}

/// In-memory bank, used by tests and by embedders without a real bank module.
#[derive(Debug, Clone, Default)]
pub struct MemoryBank {
    accounts: BTreeMap<AccountId, Balance>,
    bonded_pool: Balance,
    not_bonded_pool: Balance,
    burned: Balance,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Crédite un compte (genèse, faucet de test)
    pub fn mint(&mut self, account: AccountId, amount: Balance) {
        let balance = self.accounts.entry(account).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Total détruit par slashing
    pub fn burned(&self) -> Balance {
        self.burned
    }

    fn pool_mut(&mut self, pool: PoolKind) -> &mut Balance {
        match pool {
            PoolKind::Bonded => &mut self.bonded_pool,
            PoolKind::NotBonded => &mut self.not_bonded_pool,
        }
    }

    fn debit_pool(&mut self, pool: PoolKind, amount: Balance) -> Result<(), BankError> {
        let available = self.pool_balance(pool);
        if available < amount {
            return Err(BankError::InsufficientPoolBalance {
                pool,
                needed: amount,
                available,
            });
        }
        *self.pool_mut(pool) = available - amount;
        Ok(())
    }

    fn credit_pool(&mut self, pool: PoolKind, amount: Balance) -> Result<(), BankError> {
        let balance = self.pool_mut(pool);
        *balance = balance.checked_add(amount).ok_or(BankError::Overflow)?;
        Ok(())
    }
}

impl BankKeeper for MemoryBank {
    fn spendable_balance(&self, account: &AccountId) -> Balance {
        self.accounts.get(account).copied().unwrap_or(0)
    }

    fn pool_balance(&self, pool: PoolKind) -> Balance {
        match pool {
            PoolKind::Bonded => self.bonded_pool,
            PoolKind::NotBonded => self.not_bonded_pool,
        }
    }

    fn delegate_coins_to_pool(
        &mut self,
        from: &AccountId,
        pool: PoolKind,
        amount: Balance,
    ) -> Result<(), BankError> {
        let available = self.spendable_balance(from);
        if available < amount {
            return Err(BankError::InsufficientAccountBalance {
                account: *from,
                needed: amount,
                available,
            });
        }
        self.pool_balance(pool)
            .checked_add(amount)
            .ok_or(BankError::Overflow)?;

        self.accounts.insert(*from, available - amount);
        self.credit_pool(pool, amount)
    }

    fn undelegate_coins_from_pool(
        &mut self,
        pool: PoolKind,
        to: &AccountId,
        amount: Balance,
    ) -> Result<(), BankError> {
        let credited = self
            .spendable_balance(to)
            .checked_add(amount)
            .ok_or(BankError::Overflow)?;
        self.debit_pool(pool, amount)?;
        self.accounts.insert(*to, credited);
        Ok(())
    }

    fn transfer_between_pools(
        &mut self,
        from: PoolKind,
        to: PoolKind,
        amount: Balance,
    ) -> Result<(), BankError> {
        if from == to || amount == 0 {
            return Ok(());
        }
        self.pool_balance(to)
            .checked_add(amount)
            .ok_or(BankError::Overflow)?;
        self.debit_pool(from, amount)?;
        self.credit_pool(to, amount)
    }

    fn burn_from_pool(&mut self, pool: PoolKind, amount: Balance) -> Result<(), BankError> {
        self.debit_pool(pool, amount)?;
        self.burned = self.burned.saturating_add(amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AccountId {
        AccountId::from_bytes([1; 32])
    }

    #[test]
    fn test_delegate_and_undelegate_coins() {
        let mut bank = MemoryBank::new();
        bank.mint(alice(), 100);

        bank.delegate_coins_to_pool(&alice(), PoolKind::Bonded, 60).unwrap();
        assert_eq!(bank.spendable_balance(&alice()), 40);
        assert_eq!(bank.pool_balance(PoolKind::Bonded), 60);

        bank.transfer_between_pools(PoolKind::Bonded, PoolKind::NotBonded, 60)
            .unwrap();
        bank.undelegate_coins_from_pool(PoolKind::NotBonded, &alice(), 60)
            .unwrap();
        assert_eq!(bank.spendable_balance(&alice()), 100);
        assert_eq!(bank.pool_balance(PoolKind::NotBonded), 0);
    }

    #[test]
    fn test_insufficient_balance_leaves_state_untouched() {
        let mut bank = MemoryBank::new();
        bank.mint(alice(), 10);

        let err = bank
            .delegate_coins_to_pool(&alice(), PoolKind::NotBonded, 11)
            .unwrap_err();
        assert!(matches!(err, BankError::InsufficientAccountBalance { .. }));
        assert_eq!(bank.spendable_balance(&alice()), 10);
        assert_eq!(bank.pool_balance(PoolKind::NotBonded), 0);
    }

    #[test]
    fn test_burn_tracks_total() {
        let mut bank = MemoryBank::new();
        bank.mint(alice(), 10);
        bank.delegate_coins_to_pool(&alice(), PoolKind::Bonded, 10).unwrap();
        bank.burn_from_pool(PoolKind::Bonded, 4).unwrap();
        assert_eq!(bank.burned(), 4);
        assert_eq!(bank.pool_balance(PoolKind::Bonded), 6);
        assert!(bank.burn_from_pool(PoolKind::Bonded, 7).is_err());
    }
}
