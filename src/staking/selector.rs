// Selector - Recalcul du set de validateurs actifs à chaque fin de bloc
// Principe: Sélection déterministe, identique sur toutes les répliques
use super::bank::{BankKeeper, PoolKind};
use super::error::{StakingError, StakingResult};
use super::keeper::{invariant_violation, StakingKeeper};
use super::validator::BondStatus;
use crate::types::{AccountId, BlockContext, ConsensusPubKey, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Power change handed to the consensus driver. Power 0 removes the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    pub operator: AccountId,
    pub consensus_pubkey: ConsensusPubKey,
    pub power: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSetDelta {
    /// Entered the active set, in selection order
    pub added: Vec<ValidatorUpdate>,
    /// Stayed in the set with a different power, in selection order
    pub power_changed: Vec<ValidatorUpdate>,
    /// Left the set (power 0), by operator address
    pub removed: Vec<ValidatorUpdate>,
}

impl ValidatorSetDelta {
    pub fn len(&self) -> usize {
        self.added.len() + self.power_changed.len() + self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat list in the order the driver should apply it.
    pub fn updates(&self) -> Vec<ValidatorUpdate> {
        self.added
            .iter()
            .chain(&self.power_changed)
            .chain(&self.removed)
            .copied()
            .collect()
    }
}

impl<B: BankKeeper> StakingKeeper<B> {
    /// Top `max_validators` non-jailed validators with positive power,
    /// by power descending then operator address ascending.
    pub fn select_validator_set(&self) -> Vec<(AccountId, u64)> {
        let params = &self.state.params;
        let mut candidates: Vec<(AccountId, u64)> = self
            .state
            .validators()
            .filter(|v| !v.jailed)
            .map(|v| (v.operator, params.consensus_power(v.tokens)))
            .filter(|(_, power)| *power > 0)
            .collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        candidates.truncate(params.max_validators as usize);
        candidates
    }

    /// Bonds newcomers, starts unbonding for validators that dropped out and
    /// records the new last powers.
    pub(crate) fn apply_validator_set_updates(
        &mut self,
        ctx: &BlockContext,
    ) -> StakingResult<ValidatorSetDelta> {
        let selected = self.select_validator_set();
        let mut delta = ValidatorSetDelta::default();
        let mut new_powers = BTreeMap::new();

        for (operator, power) in selected {
            let mut validator = self.existing_validator(&operator)?;
            if !validator.is_bonded() {
                self.move_pool_tokens(PoolKind::NotBonded, PoolKind::Bonded, validator.tokens)?;
                validator.status = BondStatus::Bonded;
                validator.unbonding_height = 0;
                validator.unbonding_time = 0;
                info!("Validator {} bonded with power {}", operator, power);
            }
            let update = ValidatorUpdate {
                operator,
                consensus_pubkey: validator.consensus_pubkey,
                power,
            };
            match self.state.last_validator_powers.get(&operator) {
                None => delta.added.push(update),
                Some(previous) if *previous != power => delta.power_changed.push(update),
                Some(_) => {}
            }
            self.state.set_validator(validator);
            new_powers.insert(operator, power);
        }

        let dropped: Vec<AccountId> = self
            .state
            .last_validator_powers
            .keys()
            .filter(|operator| !new_powers.contains_key(*operator))
            .copied()
            .collect();
        for operator in dropped {
            let mut validator = self.state.validator(&operator).cloned().ok_or_else(|| {
                invariant_violation(format!("bonded validator {operator} missing from registry"))
            })?;
            self.move_pool_tokens(PoolKind::Bonded, PoolKind::NotBonded, validator.tokens)?;
            validator.status = BondStatus::Unbonding;
            validator.unbonding_height = ctx.height;
            validator.unbonding_time = ctx
                .time
                .checked_add(self.state.params.unbonding_time)
                .ok_or(StakingError::ArithmeticOverflow)?;
            delta.removed.push(ValidatorUpdate {
                operator,
                consensus_pubkey: validator.consensus_pubkey,
                power: 0,
            });
            info!(
                "Validator {} left the active set, unbonding until {}",
                operator, validator.unbonding_time
            );
            self.state.set_validator(validator);
        }

        self.state.last_validator_powers = new_powers;
        Ok(delta)
    }

    /// Unbonding -> Unbonded for validators whose unbonding time has passed.
    pub(crate) fn unbond_matured_validators(&mut self, ctx: &BlockContext) -> StakingResult<usize> {
        let due: Vec<(Timestamp, Vec<AccountId>)> = self
            .state
            .indexes
            .validator_queue
            .range(..=ctx.time)
            .map(|(time, operators)| (*time, operators.iter().copied().collect()))
            .collect();

        let mut unbonded = 0;
        for (time, operators) in due {
            for operator in operators {
                let mut validator = match self.state.validator(&operator) {
                    Some(v) if v.is_unbonding() && v.unbonding_time == time => v.clone(),
                    _ => {
                        return Err(invariant_violation(format!(
                            "validator queue at {time}: {operator} is not unbonding then"
                        )))
                    }
                };
                validator.status = BondStatus::Unbonded;
                self.state.set_validator(validator);
                unbonded += 1;
                info!("Validator {} fully unbonded", operator);
                self.remove_validator_if_empty(&operator);
            }
        }
        Ok(unbonded)
    }
}
