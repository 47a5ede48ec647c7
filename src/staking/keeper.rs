// Keeper - Point d'entrée du ledger de staking
// Principe: Toutes les mutations passent par le keeper, un bloc à la fois
use super::bank::{BankError, BankKeeper, PoolKind};
use super::error::{StakingError, StakingResult};
use super::params::Params;
use super::selector::ValidatorSetDelta;
use super::state::StakingState;
use super::validator::Validator;
use crate::types::{AccountId, Balance, BlockHeader};
use tracing::{debug, error};

/// Staking ledger bound to a bank collaborator.
///
/// NOT thread-safe by design of the state machine: the driver calls it from
/// the single block-execution thread. Clone the keeper to take a snapshot
/// that can be restored if the block is discarded.
#[derive(Debug, Clone)]
pub struct StakingKeeper<B: BankKeeper> {
    pub(crate) state: StakingState,
    pub(crate) bank: B,
}

impl<B: BankKeeper> StakingKeeper<B> {
    pub fn new(params: Params, bank: B) -> StakingResult<Self> {
        params.validate()?;
        Ok(Self {
            state: StakingState::new(params),
            bank,
        })
    }

    /// Resumes from a committed state (derived indexes are rebuilt).
    pub fn from_state(mut state: StakingState, bank: B) -> Self {
        state.rebuild_indexes();
        Self { state, bank }
    }

    pub fn state(&self) -> &StakingState {
        &self.state
    }

    pub fn into_parts(self) -> (StakingState, B) {
        (self.state, self.bank)
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    pub fn params(&self) -> &Params {
        &self.state.params
    }

    /// Governance entry point; only field-level bounds are checked.
    pub fn set_params(&mut self, params: Params) -> StakingResult<()> {
        params.validate()?;
        debug!(?params, "Staking params updated");
        self.state.params = params;
        Ok(())
    }

    pub fn validator(&self, operator: &AccountId) -> Option<&Validator> {
        self.state.validator(operator)
    }

    pub(crate) fn existing_validator(&self, operator: &AccountId) -> StakingResult<Validator> {
        self.state
            .validator(operator)
            .cloned()
            .ok_or(StakingError::ValidatorNotFound(*operator))
    }

    /// Tokens currently backing the operator's own delegation.
    pub fn self_delegated_tokens(&self, validator: &Validator) -> StakingResult<Balance> {
        match self.state.delegation(&validator.operator, &validator.operator) {
            Some(delegation) => validator.tokens_from_shares(delegation.shares),
            None => Ok(0),
        }
    }

    /// Deletes a validator once it is unbonded, empty and unreferenced.
    pub(crate) fn remove_validator_if_empty(&mut self, operator: &AccountId) -> bool {
        let removable = match self.state.validator(operator) {
            Some(v) => v.is_unbonded() && v.is_empty(),
            None => false,
        };
        if removable && !self.state.is_validator_referenced(operator) {
            self.state.remove_validator(operator);
            debug!("Validator {} removed from registry", operator);
            return true;
        }
        false
    }

    /// Pool move that must succeed for the ledger to stay consistent.
    pub(crate) fn move_pool_tokens(
        &mut self,
        from: PoolKind,
        to: PoolKind,
        amount: Balance,
    ) -> StakingResult<()> {
        self.bank
            .transfer_between_pools(from, to, amount)
            .map_err(|e| fatal_bank_error("pool transfer", e))
    }

    /// Per-block pipeline: unbonding sweep, redelegation sweep, mature
    /// validators, set selection, historical snapshot.
    ///
    /// Must be called exactly once per block, after all transactions. A
    /// repeated call with the same header changes nothing.
    pub fn end_block(&mut self, header: &BlockHeader) -> StakingResult<ValidatorSetDelta> {
        let ctx = header.context();

        let released = self.complete_matured_unbondings(&ctx)?;
        let matured = self.complete_matured_redelegations(&ctx)?;
        let unbonded = self.unbond_matured_validators(&ctx)?;
        let delta = self.apply_validator_set_updates(&ctx)?;
        self.track_historical_info(header)?;

        debug!(
            height = header.height,
            released,
            matured,
            unbonded,
            updates = delta.len(),
            "Staking end block"
        );
        Ok(delta)
    }
}

pub(crate) fn fatal_bank_error(context: &str, err: BankError) -> StakingError {
    error!("Bank rejected {}: {}", context, err);
    StakingError::InvariantViolation(format!("{context}: {err}"))
}

pub(crate) fn invariant_violation(message: String) -> StakingError {
    error!("{}", message);
    StakingError::InvariantViolation(message)
}
