// Unbonding - File temporelle des retraits en cours
// Principe: Les tokens ne redeviennent liquides qu'après unbonding_time
use super::bank::{BankKeeper, PoolKind};
use super::error::StakingResult;
use super::keeper::{fatal_bank_error, invariant_violation, StakingKeeper};
use crate::types::{AccountId, Balance, BlockContext, BlockNumber, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingDelegationEntry {
    pub creation_height: BlockNumber,
    pub completion_time: Timestamp,
    /// Tokens at creation (reduced by partial cancellations)
    pub initial_balance: Balance,
    /// Tokens to release at maturity (reduced by slashing and cancellation)
    pub balance: Balance,
}

impl UnbondingDelegationEntry {
    pub fn new(creation_height: BlockNumber, completion_time: Timestamp, balance: Balance) -> Self {
        Self {
            creation_height,
            completion_time,
            initial_balance: balance,
            balance,
        }
    }

    pub fn is_mature(&self, now: Timestamp) -> bool {
        self.completion_time <= now
    }
}

/// Unbonding entries of one (delegator, validator) pair, in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingDelegation {
    pub delegator: AccountId,
    pub validator: AccountId,
    pub entries: Vec<UnbondingDelegationEntry>,
}

impl UnbondingDelegation {
    pub fn new(delegator: AccountId, validator: AccountId) -> Self {
        Self {
            delegator,
            validator,
            entries: Vec::new(),
        }
    }
}

impl<B: BankKeeper> StakingKeeper<B> {
    /// Releases every unbonding entry with `completion_time <= now` to its
    /// delegator. Queue slots are processed in time order, pairs within a
    /// slot by (delegator, validator).
    ///
    /// A queue slot without a matching entry means the ledger is corrupt and
    /// aborts the block.
    pub(crate) fn complete_matured_unbondings(
        &mut self,
        ctx: &BlockContext,
    ) -> StakingResult<usize> {
        let due: Vec<(Timestamp, Vec<(AccountId, AccountId)>)> = self
            .state
            .indexes
            .unbonding_queue
            .range(..=ctx.time)
            .map(|(time, pairs)| (*time, pairs.iter().copied().collect()))
            .collect();

        let mut released = 0;
        for (time, pairs) in due {
            for (delegator, validator) in pairs {
                let mut ubd = self
                    .state
                    .unbonding_delegation(&delegator, &validator)
                    .cloned()
                    .ok_or_else(|| {
                        invariant_violation(format!(
                            "unbonding queue at {time}: no record ({delegator}, {validator})"
                        ))
                    })?;

                let (matured, pending): (Vec<_>, Vec<_>) = ubd
                    .entries
                    .into_iter()
                    .partition(|e| e.completion_time == time);
                if matured.is_empty() {
                    return Err(invariant_violation(format!(
                        "unbonding queue at {time} has no entry for ({delegator}, {validator})"
                    )));
                }

                for entry in &matured {
                    if entry.balance > 0 {
                        self.bank
                            .undelegate_coins_from_pool(
                                PoolKind::NotBonded,
                                &delegator,
                                entry.balance,
                            )
                            .map_err(|e| fatal_bank_error("unbonding release", e))?;
                    }
                    released += 1;
                    debug!(
                        "Unbonding complete {} <- {}: {} tokens released",
                        delegator, validator, entry.balance
                    );
                }

                ubd.entries = pending;
                self.state.set_unbonding_delegation(ubd);
                self.remove_validator_if_empty(&validator);
            }
        }
        Ok(released)
    }
}
