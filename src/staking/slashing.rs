// Slashing - Hook appelé par le module d'évidence
// Principe: Les tokens baissent, les parts restent; le taux de change absorbe la perte
use super::bank::{BankKeeper, PoolKind};
use super::delegation::Delegation;
use super::error::{StakingError, StakingResult};
use super::keeper::{fatal_bank_error, StakingKeeper};
use super::state::DvPair;
use super::unbonding::UnbondingDelegation;
use super::validator::Validator;
use crate::types::{mul_rate_floor, AccountId, Balance, BlockContext, BlockNumber, Rate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Tokens burned by one slash, by origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashOutcome {
    pub validator_burned: Balance,
    pub unbonding_burned: Balance,
    pub redelegation_burned: Balance,
}

impl SlashOutcome {
    pub fn total(&self) -> Balance {
        self.validator_burned
            .saturating_add(self.unbonding_burned)
            .saturating_add(self.redelegation_burned)
    }
}

impl<B: BankKeeper> StakingKeeper<B> {
    /// Burns `fraction` of the validator's tokens without touching its
    /// shares. For a past infraction, unbonding and redelegation entries
    /// created from this validator at or after `infraction_height` are
    /// slashed by the same fraction.
    pub fn slash(
        &mut self,
        ctx: &BlockContext,
        operator: &AccountId,
        infraction_height: BlockNumber,
        fraction: Rate,
    ) -> StakingResult<SlashOutcome> {
        if fraction < Decimal::ZERO || fraction >= Decimal::ONE {
            return Err(StakingError::InvalidSlashFraction(fraction));
        }
        if infraction_height > ctx.height {
            return Err(StakingError::FutureInfraction {
                infraction: infraction_height,
                current: ctx.height,
            });
        }
        let validator = self.existing_validator(operator)?;

        let mut outcome = SlashOutcome::default();
        let mut burns: Vec<(PoolKind, Balance)> = Vec::new();
        let mut staged_ubds: Vec<UnbondingDelegation> = Vec::new();
        let mut staged_validators: BTreeMap<AccountId, Validator> = BTreeMap::new();
        let mut staged_delegations: BTreeMap<DvPair, Delegation> = BTreeMap::new();

        if infraction_height < ctx.height {
            for ubd in self
                .state
                .unbonding_delegations()
                .filter(|u| &u.validator == operator)
            {
                let mut slashed = ubd.clone();
                let mut burned: Balance = 0;
                for entry in slashed.entries.iter_mut() {
                    if entry.creation_height < infraction_height || entry.is_mature(ctx.time) {
                        continue;
                    }
                    let cut = mul_rate_floor(entry.initial_balance, fraction)
                        .ok_or(StakingError::ArithmeticOverflow)?
                        .min(entry.balance);
                    entry.balance -= cut;
                    burned += cut;
                }
                if burned > 0 {
                    slashed.entries.retain(|e| e.balance > 0);
                    outcome.unbonding_burned += burned;
                    staged_ubds.push(slashed);
                }
            }
            if outcome.unbonding_burned > 0 {
                burns.push((PoolKind::NotBonded, outcome.unbonding_burned));
            }

            for red in self.state.redelegations().filter(|r| &r.src == operator) {
                for entry in &red.entries {
                    if entry.creation_height < infraction_height || entry.is_mature(ctx.time) {
                        continue;
                    }
                    let key = (red.delegator, red.dst);
                    let delegation = match staged_delegations.get(&key) {
                        Some(d) => d.clone(),
                        None => match self.state.delegation(&red.delegator, &red.dst) {
                            Some(d) => d.clone(),
                            // Already moved on or unbonded from dst
                            None => continue,
                        },
                    };
                    let wanted = entry
                        .shares_dst
                        .mul_truncate(fraction)
                        .ok_or(StakingError::ArithmeticOverflow)?;
                    let to_unbond = wanted.min(delegation.shares);
                    if to_unbond.is_zero() {
                        continue;
                    }

                    let dst = match staged_validators.get(&red.dst) {
                        Some(v) => v.clone(),
                        None => self.existing_validator(&red.dst)?,
                    };
                    let (dst, tokens) = dst.remove_del_shares(to_unbond)?;
                    let remaining = delegation
                        .shares
                        .checked_sub(to_unbond)
                        .ok_or(StakingError::ArithmeticOverflow)?;

                    if tokens > 0 {
                        burns.push((dst.pool(), tokens));
                        outcome.redelegation_burned += tokens;
                    }
                    staged_delegations
                        .insert(key, Delegation::new(red.delegator, red.dst, remaining));
                    staged_validators.insert(red.dst, dst);
                }
            }
        }

        let validator_burn =
            mul_rate_floor(validator.tokens, fraction).ok_or(StakingError::ArithmeticOverflow)?;
        outcome.validator_burned = validator_burn;
        if validator_burn > 0 {
            burns.push((validator.pool(), validator_burn));
        }
        staged_validators.insert(*operator, validator.remove_tokens(validator_burn));

        for (pool, amount) in burns {
            self.bank
                .burn_from_pool(pool, amount)
                .map_err(|e| fatal_bank_error("slash burn", e))?;
        }
        for ubd in staged_ubds {
            self.state.set_unbonding_delegation(ubd);
        }
        for (_, delegation) in staged_delegations {
            self.state.set_delegation(delegation);
        }
        for (_, validator) in staged_validators {
            self.state.set_validator(validator);
        }

        info!(
            "Validator {} slashed {} at infraction height {}: {} tokens burned",
            operator,
            fraction,
            infraction_height,
            outcome.total()
        );
        Ok(outcome)
    }
}
