// Redelegation - Transferts de parts entre validateurs sans délai d'unbonding
// Principe: Pas de saut en chaîne tant que la redelegation n'est pas mature
use super::bank::{BankKeeper, PoolKind};
use super::delegation::Delegation;
use super::error::{StakingError, StakingResult};
use super::keeper::{fatal_bank_error, invariant_violation, StakingKeeper};
use crate::types::{AccountId, Balance, BlockContext, BlockNumber, Shares, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedelegationEntry {
    pub creation_height: BlockNumber,
    pub completion_time: Timestamp,
    pub initial_balance: Balance,
    /// Shares issued on the destination validator
    pub shares_dst: Shares,
}

impl RedelegationEntry {
    pub fn is_mature(&self, now: Timestamp) -> bool {
        self.completion_time <= now
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redelegation {
    pub delegator: AccountId,
    pub src: AccountId,
    pub dst: AccountId,
    pub entries: Vec<RedelegationEntry>,
}

impl Redelegation {
    pub fn new(delegator: AccountId, src: AccountId, dst: AccountId) -> Self {
        Self {
            delegator,
            src,
            dst,
            entries: Vec::new(),
        }
    }
}

impl<B: BankKeeper> StakingKeeper<B> {
    /// Moves `amount` tokens worth of shares from `src` to `dst`. Both
    /// validators' power changes now; the returned completion time is when
    /// the moved stake may be redelegated again.
    pub fn begin_redelegate(
        &mut self,
        ctx: &BlockContext,
        delegator: &AccountId,
        src: &AccountId,
        dst: &AccountId,
        amount: Balance,
    ) -> StakingResult<Timestamp> {
        if src == dst {
            return Err(StakingError::SelfRedelegation);
        }
        if amount == 0 {
            return Err(StakingError::InvalidAmount("redelegation amount must be positive"));
        }
        let source = self.existing_validator(src)?;
        let target = self.existing_validator(dst)?;
        if target.jailed {
            return Err(StakingError::RedelegationToJailedValidator(*dst));
        }
        // Stake that arrived on `src` by redelegation may not hop again
        // before it matures (covers A -> B -> A as well as A -> B -> C).
        if self.state.has_receiving_redelegation(delegator, src) {
            return Err(StakingError::RedelegationLoop { src: *src });
        }

        let mut red = self
            .state
            .redelegation(delegator, src, dst)
            .cloned()
            .unwrap_or_else(|| Redelegation::new(*delegator, *src, *dst));
        if red.entries.len() >= self.state.params.max_entries as usize {
            return Err(StakingError::MaxRedelegationEntriesExceeded {
                delegator: *delegator,
                src: *src,
                dst: *dst,
            });
        }

        let delegation = self
            .state
            .delegation(delegator, src)
            .cloned()
            .ok_or(StakingError::DelegationNotFound {
                delegator: *delegator,
                validator: *src,
            })?;
        let shares = source.shares_from_tokens(amount)?;
        let remaining = delegation
            .shares
            .checked_sub(shares)
            .ok_or(StakingError::InsufficientShares {
                requested: shares,
                available: delegation.shares,
            })?;

        let (mut updated_src, tokens) = source.remove_del_shares(shares)?;
        if tokens == 0 {
            return Err(StakingError::InvalidAmount("amount too small to redelegate"));
        }
        self.enforce_self_delegation_floor(delegator, &mut updated_src, remaining)?;

        let (updated_dst, shares_dst) = target.add_tokens_from_del(tokens)?;
        let dst_shares = self
            .state
            .delegation(delegator, dst)
            .map(|d| d.shares)
            .unwrap_or(Shares::ZERO)
            .checked_add(shares_dst)
            .ok_or(StakingError::ArithmeticOverflow)?;

        let completion_time = ctx
            .time
            .checked_add(self.state.params.unbonding_time)
            .ok_or(StakingError::ArithmeticOverflow)?;

        match (source.pool(), target.pool()) {
            (PoolKind::Bonded, PoolKind::NotBonded) | (PoolKind::NotBonded, PoolKind::Bonded) => {
                self.bank
                    .transfer_between_pools(source.pool(), target.pool(), tokens)
                    .map_err(|e| fatal_bank_error("redelegation", e))?;
            }
            _ => {}
        }

        red.entries.push(RedelegationEntry {
            creation_height: ctx.height,
            completion_time,
            initial_balance: tokens,
            shares_dst,
        });
        self.state.set_validator(updated_src);
        self.state.set_validator(updated_dst);
        self.state
            .set_delegation(Delegation::new(*delegator, *src, remaining));
        self.state
            .set_delegation(Delegation::new(*delegator, *dst, dst_shares));
        self.state.set_redelegation(red);

        debug!(
            height = ctx.height,
            "Redelegation {}: {} -> {}, {} tokens until {}",
            delegator,
            src,
            dst,
            tokens,
            completion_time
        );
        Ok(completion_time)
    }

    /// Drops matured redelegation entries. No tokens move: maturity only
    /// lifts the hop restriction on the destination.
    pub(crate) fn complete_matured_redelegations(
        &mut self,
        ctx: &BlockContext,
    ) -> StakingResult<usize> {
        let due: Vec<(Timestamp, Vec<(AccountId, AccountId, AccountId)>)> = self
            .state
            .indexes
            .redelegation_queue
            .range(..=ctx.time)
            .map(|(time, triplets)| (*time, triplets.iter().copied().collect()))
            .collect();

        let mut matured = 0;
        for (time, triplets) in due {
            for (delegator, src, dst) in triplets {
                let mut red = self
                    .state
                    .redelegation(&delegator, &src, &dst)
                    .cloned()
                    .ok_or_else(|| {
                        invariant_violation(format!(
                            "redelegation queue at {time}: no record ({delegator}, {src}, {dst})"
                        ))
                    })?;

                let before = red.entries.len();
                red.entries.retain(|e| e.completion_time != time);
                let removed = before - red.entries.len();
                if removed == 0 {
                    return Err(invariant_violation(format!(
                        "redelegation queue at {time} has no entry for ({delegator}, {src}, {dst})"
                    )));
                }
                matured += removed;

                self.state.set_redelegation(red);
                self.remove_validator_if_empty(&src);
                self.remove_validator_if_empty(&dst);
            }
        }
        Ok(matured)
    }
}
