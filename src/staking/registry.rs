// Registry - Création, édition et jailing des validateurs
use super::bank::BankKeeper;
use super::error::{StakingError, StakingResult};
use super::keeper::StakingKeeper;
use super::validator::{Commission, CommissionRates, Description, DescriptionUpdate, Validator};
use crate::types::{AccountId, Balance, BlockContext, ConsensusPubKey, Rate};
use tracing::info;

/// Create-validator request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewValidator {
    pub operator: AccountId,
    pub consensus_pubkey: ConsensusPubKey,
    pub description: Description,
    pub commission: CommissionRates,
    pub min_self_delegation: Balance,
    /// Tokens moved from the operator's balance as initial self-delegation
    pub self_delegation: Balance,
}

/// Edit-validator request; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorEdit {
    pub description: Option<DescriptionUpdate>,
    pub commission_rate: Option<Rate>,
    pub min_self_delegation: Option<Balance>,
}

impl<B: BankKeeper> StakingKeeper<B> {
    /// Registers an Unbonded validator seeded with its self-delegation.
    pub fn create_validator(
        &mut self,
        ctx: &BlockContext,
        request: NewValidator,
    ) -> StakingResult<()> {
        if self.state.validator(&request.operator).is_some() {
            return Err(StakingError::ValidatorAlreadyExists(request.operator));
        }
        if let Some(existing) = self.state.validator_by_cons_key(&request.consensus_pubkey) {
            return Err(StakingError::ConsensusKeyInUse(existing.operator));
        }
        request.commission.validate()?;
        let min_rate = self.state.params.min_commission_rate;
        if request.commission.rate < min_rate {
            return Err(StakingError::CommissionRateTooLow {
                rate: request.commission.rate,
                min: min_rate,
            });
        }
        request.description.ensure_length()?;
        if request.min_self_delegation == 0 {
            return Err(StakingError::InvalidAmount(
                "minimum self-delegation must be positive",
            ));
        }
        if request.self_delegation < request.min_self_delegation {
            return Err(StakingError::SelfDelegationBelowMinimum {
                self_bond: request.self_delegation,
                minimum: request.min_self_delegation,
            });
        }

        let validator = Validator::new(
            request.operator,
            request.consensus_pubkey,
            request.description,
            Commission::new(request.commission, ctx.time),
            request.min_self_delegation,
        );

        // The validator record is only written once the bank has accepted
        // the self-delegation.
        self.delegate_to(&request.operator, validator, request.self_delegation)?;

        info!(
            "Validator {} created (self-delegation {})",
            request.operator, request.self_delegation
        );
        Ok(())
    }

    pub fn edit_validator(
        &mut self,
        ctx: &BlockContext,
        operator: &AccountId,
        edit: ValidatorEdit,
    ) -> StakingResult<()> {
        let mut validator = self.existing_validator(operator)?;

        if let Some(update) = &edit.description {
            validator.description = validator.description.updated(update)?;
        }

        if let Some(new_rate) = edit.commission_rate {
            validator.commission.validate_new_rate(
                new_rate,
                self.state.params.min_commission_rate,
                ctx.time,
            )?;
            validator.commission.rates.rate = new_rate;
            validator.commission.update_time = ctx.time;
        }

        if let Some(new_min) = edit.min_self_delegation {
            if new_min < validator.min_self_delegation {
                return Err(StakingError::MinSelfDelegationDecreased {
                    current: validator.min_self_delegation,
                    requested: new_min,
                });
            }
            let self_bond = self.self_delegated_tokens(&validator)?;
            if self_bond < new_min {
                return Err(StakingError::SelfDelegationBelowMinimum {
                    self_bond,
                    minimum: new_min,
                });
            }
            validator.min_self_delegation = new_min;
        }

        self.state.set_validator(validator);
        Ok(())
    }

    /// Excludes the validator from set selection; it leaves the active set
    /// at the next end block.
    pub fn jail(&mut self, operator: &AccountId) -> StakingResult<()> {
        let mut validator = self.existing_validator(operator)?;
        if validator.jailed {
            return Err(StakingError::ValidatorJailed(*operator));
        }
        validator.jailed = true;
        self.state.set_validator(validator);
        info!("Validator {} jailed", operator);
        Ok(())
    }

    pub fn unjail(&mut self, operator: &AccountId) -> StakingResult<()> {
        let mut validator = self.existing_validator(operator)?;
        if !validator.jailed {
            return Err(StakingError::ValidatorNotJailed(*operator));
        }
        let self_bond = self.self_delegated_tokens(&validator)?;
        if self_bond < validator.min_self_delegation {
            return Err(StakingError::SelfDelegationBelowMinimum {
                self_bond,
                minimum: validator.min_self_delegation,
            });
        }
        validator.jailed = false;
        self.state.set_validator(validator);
        info!("Validator {} unjailed", operator);
        Ok(())
    }
}
