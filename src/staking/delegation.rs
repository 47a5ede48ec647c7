// Delegation - Parts détenues par un délégateur sur un validateur
use super::bank::{BankKeeper, PoolKind};
use super::error::{StakingError, StakingResult};
use super::keeper::{fatal_bank_error, StakingKeeper};
use super::unbonding::{UnbondingDelegation, UnbondingDelegationEntry};
use super::validator::Validator;
use crate::types::{AccountId, Balance, BlockContext, BlockNumber, Shares, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator: AccountId,
    pub validator: AccountId,
    pub shares: Shares,
}

impl Delegation {
    pub fn new(delegator: AccountId, validator: AccountId, shares: Shares) -> Self {
        Self {
            delegator,
            validator,
            shares,
        }
    }
}

impl<B: BankKeeper> StakingKeeper<B> {
    /// Bonds `amount` tokens from the delegator's balance to the validator.
    /// Returns the shares issued.
    pub fn delegate(
        &mut self,
        ctx: &BlockContext,
        delegator: &AccountId,
        validator: &AccountId,
        amount: Balance,
    ) -> StakingResult<Shares> {
        let target = self.existing_validator(validator)?;
        if target.jailed {
            return Err(StakingError::ValidatorJailed(*validator));
        }
        let issued = self.delegate_to(delegator, target, amount)?;
        debug!(
            height = ctx.height,
            "Delegation {} -> {}: {} tokens, {} shares",
            delegator,
            validator,
            amount,
            issued
        );
        Ok(issued)
    }

    /// Shared by delegate and create-validator: issues shares, debits the
    /// bank, then writes the validator and delegation.
    pub(crate) fn delegate_to(
        &mut self,
        delegator: &AccountId,
        validator: Validator,
        amount: Balance,
    ) -> StakingResult<Shares> {
        let (updated, issued) = validator.add_tokens_from_del(amount)?;
        let current = self
            .state
            .delegation(delegator, &validator.operator)
            .map(|d| d.shares)
            .unwrap_or(Shares::ZERO);
        let shares = current
            .checked_add(issued)
            .ok_or(StakingError::ArithmeticOverflow)?;

        self.bank
            .delegate_coins_to_pool(delegator, validator.pool(), amount)?;

        self.state.set_validator(updated);
        self.state
            .set_delegation(Delegation::new(*delegator, validator.operator, shares));
        Ok(issued)
    }

    /// Starts unbonding `amount` tokens worth of shares. Voting power drops
    /// immediately; tokens are released by the unbonding sweep at the
    /// returned completion time.
    pub fn undelegate(
        &mut self,
        ctx: &BlockContext,
        delegator: &AccountId,
        validator: &AccountId,
        amount: Balance,
    ) -> StakingResult<Timestamp> {
        if amount == 0 {
            return Err(StakingError::InvalidAmount("undelegation amount must be positive"));
        }
        let source = self.existing_validator(validator)?;
        let delegation = self
            .state
            .delegation(delegator, validator)
            .cloned()
            .ok_or(StakingError::DelegationNotFound {
                delegator: *delegator,
                validator: *validator,
            })?;

        let shares = source.shares_from_tokens(amount)?;
        let remaining = delegation
            .shares
            .checked_sub(shares)
            .ok_or(StakingError::InsufficientShares {
                requested: shares,
                available: delegation.shares,
            })?;

        let mut ubd = self
            .state
            .unbonding_delegation(delegator, validator)
            .cloned()
            .unwrap_or_else(|| UnbondingDelegation::new(*delegator, *validator));
        if ubd.entries.len() >= self.state.params.max_entries as usize {
            return Err(StakingError::MaxUnbondingEntriesExceeded {
                delegator: *delegator,
                validator: *validator,
            });
        }

        let (mut updated, tokens) = source.remove_del_shares(shares)?;
        if tokens == 0 {
            return Err(StakingError::InvalidAmount("amount too small to unbond"));
        }
        self.enforce_self_delegation_floor(delegator, &mut updated, remaining)?;

        let completion_time = ctx
            .time
            .checked_add(self.state.params.unbonding_time)
            .ok_or(StakingError::ArithmeticOverflow)?;

        if source.is_bonded() {
            self.bank
                .transfer_between_pools(PoolKind::Bonded, PoolKind::NotBonded, tokens)
                .map_err(|e| fatal_bank_error("undelegation", e))?;
        }

        ubd.entries.push(UnbondingDelegationEntry::new(
            ctx.height,
            completion_time,
            tokens,
        ));
        self.state.set_validator(updated);
        self.state
            .set_delegation(Delegation::new(*delegator, *validator, remaining));
        self.state.set_unbonding_delegation(ubd);

        debug!(
            height = ctx.height,
            "Undelegation {} <- {}: {} tokens until {}",
            delegator,
            validator,
            tokens,
            completion_time
        );
        Ok(completion_time)
    }

    /// Returns part or all of an unmatured unbonding entry to the validator,
    /// re-issuing shares at the current exchange rate.
    pub fn cancel_unbonding_delegation(
        &mut self,
        ctx: &BlockContext,
        delegator: &AccountId,
        validator: &AccountId,
        creation_height: BlockNumber,
        amount: Balance,
    ) -> StakingResult<Shares> {
        if amount == 0 {
            return Err(StakingError::InvalidAmount("cancel amount must be positive"));
        }
        let target = self.existing_validator(validator)?;
        if target.jailed {
            return Err(StakingError::ValidatorJailed(*validator));
        }

        let mut ubd = self
            .state
            .unbonding_delegation(delegator, validator)
            .cloned()
            .ok_or(StakingError::EntryNotFound { creation_height })?;
        let index = ubd
            .entries
            .iter()
            .position(|e| e.creation_height == creation_height && !e.is_mature(ctx.time))
            .ok_or(StakingError::EntryNotFound { creation_height })?;
        let balance = ubd.entries[index].balance;
        if amount > balance {
            return Err(StakingError::AmountExceedsEntry {
                requested: amount,
                balance,
            });
        }

        let (updated, issued) = target.add_tokens_from_del(amount)?;
        let current = self
            .state
            .delegation(delegator, validator)
            .map(|d| d.shares)
            .unwrap_or(Shares::ZERO);
        let shares = current
            .checked_add(issued)
            .ok_or(StakingError::ArithmeticOverflow)?;

        if target.is_bonded() {
            self.bank
                .transfer_between_pools(PoolKind::NotBonded, PoolKind::Bonded, amount)
                .map_err(|e| fatal_bank_error("unbonding cancellation", e))?;
        }

        let entry = &mut ubd.entries[index];
        entry.balance -= amount;
        entry.initial_balance = entry.initial_balance.saturating_sub(amount);
        if entry.balance == 0 {
            ubd.entries.remove(index);
        }

        self.state.set_validator(updated);
        self.state
            .set_delegation(Delegation::new(*delegator, *validator, shares));
        self.state.set_unbonding_delegation(ubd);

        debug!(
            height = ctx.height,
            "Unbonding cancelled {} -> {}: {} tokens, {} shares",
            delegator,
            validator,
            amount,
            issued
        );
        Ok(issued)
    }

    /// Jails the validator when its operator's remaining self-delegation
    /// falls below the floor.
    pub(crate) fn enforce_self_delegation_floor(
        &self,
        delegator: &AccountId,
        validator: &mut Validator,
        remaining: Shares,
    ) -> StakingResult<()> {
        if *delegator != validator.operator || validator.jailed {
            return Ok(());
        }
        let self_bond = validator.tokens_from_shares(remaining)?;
        if self_bond < validator.min_self_delegation {
            warn!(
                "Validator {} self-delegation {} below minimum {}, jailing",
                validator.operator, self_bond, validator.min_self_delegation
            );
            validator.jailed = true;
        }
        Ok(())
    }
}
