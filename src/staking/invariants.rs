// Invariants - Vérifications de cohérence du ledger
// Principe: Chaque token comptabilisé ici existe exactement une fois dans un pool
use super::bank::{BankKeeper, PoolKind};
use super::error::StakingResult;
use super::keeper::{invariant_violation, StakingKeeper};
use crate::types::{AccountId, Balance, Shares};
use std::collections::BTreeMap;

impl<B: BankKeeper> StakingKeeper<B> {
    /// Verifies ledger-wide accounting. Any failure means the state is
    /// corrupted and must not be committed.
    pub fn check_invariants(&self) -> StakingResult<()> {
        let state = &self.state;

        let mut share_sums: BTreeMap<AccountId, Shares> = BTreeMap::new();
        for delegation in state.delegations() {
            if delegation.shares.is_zero() {
                return Err(invariant_violation(format!(
                    "zero-share delegation {} -> {}",
                    delegation.delegator, delegation.validator
                )));
            }
            if state.validator(&delegation.validator).is_none() {
                return Err(invariant_violation(format!(
                    "delegation to unknown validator {}",
                    delegation.validator
                )));
            }
            let sum = share_sums.entry(delegation.validator).or_default();
            *sum = sum
                .checked_add(delegation.shares)
                .ok_or_else(|| invariant_violation("share sum overflow".into()))?;
        }

        let mut bonded: Balance = 0;
        let mut not_bonded: Balance = 0;
        for validator in state.validators() {
            if (validator.tokens == 0) != validator.delegator_shares.is_zero() {
                return Err(invariant_violation(format!(
                    "validator {} holds {} tokens for {} shares",
                    validator.operator, validator.tokens, validator.delegator_shares
                )));
            }
            let delegated = share_sums
                .get(&validator.operator)
                .copied()
                .unwrap_or(Shares::ZERO);
            if delegated != validator.delegator_shares {
                return Err(invariant_violation(format!(
                    "validator {} issued {} shares, delegations hold {}",
                    validator.operator, validator.delegator_shares, delegated
                )));
            }
            match validator.pool() {
                PoolKind::Bonded => bonded = add_checked(bonded, validator.tokens)?,
                PoolKind::NotBonded => not_bonded = add_checked(not_bonded, validator.tokens)?,
            }
        }

        for ubd in state.unbonding_delegations() {
            if ubd.entries.is_empty() {
                return Err(invariant_violation(format!(
                    "empty unbonding record {} -> {}",
                    ubd.delegator, ubd.validator
                )));
            }
            for entry in &ubd.entries {
                if entry.balance == 0 || entry.balance > entry.initial_balance {
                    return Err(invariant_violation(format!(
                        "unbonding entry {} -> {} at height {} has balance {}",
                        ubd.delegator, ubd.validator, entry.creation_height, entry.balance
                    )));
                }
                not_bonded = add_checked(not_bonded, entry.balance)?;
            }
        }

        for red in state.redelegations() {
            if red.entries.is_empty() {
                return Err(invariant_violation(format!(
                    "empty redelegation record {} : {} -> {}",
                    red.delegator, red.src, red.dst
                )));
            }
        }

        let bonded_pool = self.bank.pool_balance(PoolKind::Bonded);
        if bonded_pool != bonded {
            return Err(invariant_violation(format!(
                "bonded pool holds {}, bonded validators account for {}",
                bonded_pool, bonded
            )));
        }
        let not_bonded_pool = self.bank.pool_balance(PoolKind::NotBonded);
        if not_bonded_pool != not_bonded {
            return Err(invariant_violation(format!(
                "not-bonded pool holds {}, ledger accounts for {}",
                not_bonded_pool, not_bonded
            )));
        }

        for (operator, _) in state.last_validator_powers.iter() {
            match state.validator(operator) {
                Some(v) if v.is_bonded() => {}
                _ => {
                    return Err(invariant_violation(format!(
                        "last power recorded for non-bonded validator {}",
                        operator
                    )))
                }
            }
        }

        if state.derive_indexes() != *state.indexes() {
            return Err(invariant_violation("queue indexes out of sync".into()));
        }
        Ok(())
    }
}

fn add_checked(total: Balance, amount: Balance) -> StakingResult<Balance> {
    total
        .checked_add(amount)
        .ok_or_else(|| invariant_violation("token sum overflow".into()))
}
