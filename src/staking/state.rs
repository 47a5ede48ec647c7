// State - Tables du ledger de staking et index dérivés
// Principe: Les index de file sont reconstructibles, jamais source de vérité
use super::delegation::Delegation;
use super::historical::HistoricalInfo;
use super::params::Params;
use super::redelegation::Redelegation;
use super::unbonding::UnbondingDelegation;
use super::validator::{BondStatus, Validator};
use crate::types::{AccountId, BlockNumber, ConsensusPubKey, Timestamp};
use std::collections::{BTreeMap, BTreeSet};

/// (delegator, validator)
pub type DvPair = (AccountId, AccountId);

/// (delegator, source validator, destination validator)
pub type DvvTriplet = (AccountId, AccountId, AccountId);

/// Time-indexed queues and secondary indexes, derived from the primary tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueIndexes {
    /// completion_time -> pairs with an unbonding entry maturing then
    pub unbonding_queue: BTreeMap<Timestamp, BTreeSet<DvPair>>,
    /// completion_time -> triplets with a redelegation entry maturing then
    pub redelegation_queue: BTreeMap<Timestamp, BTreeSet<DvvTriplet>>,
    /// unbonding_time -> validators in Unbonding status
    pub validator_queue: BTreeMap<Timestamp, BTreeSet<AccountId>>,
    /// (delegator, dst) -> sources with a live redelegation into dst
    pub redelegations_by_dst: BTreeMap<DvPair, BTreeSet<AccountId>>,
}

/// Full ledger state for one committed height.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StakingState {
    pub(crate) params: Params,
    pub(crate) validators: BTreeMap<AccountId, Validator>,
    pub(crate) validators_by_cons_key: BTreeMap<ConsensusPubKey, AccountId>,
    pub(crate) delegations: BTreeMap<DvPair, Delegation>,
    pub(crate) unbonding_delegations: BTreeMap<DvPair, UnbondingDelegation>,
    pub(crate) redelegations: BTreeMap<DvvTriplet, Redelegation>,
    /// Power last reported to the consensus driver, bonded validators only
    pub(crate) last_validator_powers: BTreeMap<AccountId, u64>,
    pub(crate) historical_info: BTreeMap<BlockNumber, HistoricalInfo>,
    pub(crate) indexes: QueueIndexes,
}

fn queue_insert<K: Ord + Copy, V: Ord + Copy>(
    queue: &mut BTreeMap<K, BTreeSet<V>>,
    key: K,
    value: V,
) {
    queue.entry(key).or_default().insert(value);
}

fn queue_remove<K: Ord + Copy, V: Ord>(queue: &mut BTreeMap<K, BTreeSet<V>>, key: K, value: &V) {
    if let Some(set) = queue.get_mut(&key) {
        set.remove(value);
        if set.is_empty() {
            queue.remove(&key);
        }
    }
}

impl StakingState {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn indexes(&self) -> &QueueIndexes {
        &self.indexes
    }

    // ----- Validators -----

    pub fn validator(&self, operator: &AccountId) -> Option<&Validator> {
        self.validators.get(operator)
    }

    pub fn validator_by_cons_key(&self, key: &ConsensusPubKey) -> Option<&Validator> {
        self.validators_by_cons_key
            .get(key)
            .and_then(|operator| self.validators.get(operator))
    }

    pub fn validators(&self) -> impl Iterator<Item = &Validator> {
        self.validators.values()
    }

    /// Writes a validator and keeps the consensus-key index and the
    /// validator unbonding queue in step.
    pub(crate) fn set_validator(&mut self, validator: Validator) {
        if let Some(old) = self.validators.get(&validator.operator) {
            if old.status == BondStatus::Unbonding {
                queue_remove(
                    &mut self.indexes.validator_queue,
                    old.unbonding_time,
                    &old.operator,
                );
            }
        }
        if validator.status == BondStatus::Unbonding {
            queue_insert(
                &mut self.indexes.validator_queue,
                validator.unbonding_time,
                validator.operator,
            );
        }
        self.validators_by_cons_key
            .insert(validator.consensus_pubkey, validator.operator);
        self.validators.insert(validator.operator, validator);
    }

    pub(crate) fn remove_validator(&mut self, operator: &AccountId) -> Option<Validator> {
        let validator = self.validators.remove(operator)?;
        self.validators_by_cons_key.remove(&validator.consensus_pubkey);
        if validator.status == BondStatus::Unbonding {
            queue_remove(
                &mut self.indexes.validator_queue,
                validator.unbonding_time,
                operator,
            );
        }
        self.last_validator_powers.remove(operator);
        Some(validator)
    }

    /// True if any delegation, unbonding entry or redelegation entry names the validator.
    pub fn is_validator_referenced(&self, operator: &AccountId) -> bool {
        self.delegations.keys().any(|(_, v)| v == operator)
            || self.unbonding_delegations.keys().any(|(_, v)| v == operator)
            || self
                .redelegations
                .keys()
                .any(|(_, src, dst)| src == operator || dst == operator)
    }

    // ----- Delegations -----

    pub fn delegation(&self, delegator: &AccountId, validator: &AccountId) -> Option<&Delegation> {
        self.delegations.get(&(*delegator, *validator))
    }

    pub fn delegations(&self) -> impl Iterator<Item = &Delegation> {
        self.delegations.values()
    }

    /// Writes a delegation; zero-share records are deleted instead.
    pub(crate) fn set_delegation(&mut self, delegation: Delegation) {
        let key = (delegation.delegator, delegation.validator);
        if delegation.shares.is_zero() {
            self.delegations.remove(&key);
        } else {
            self.delegations.insert(key, delegation);
        }
    }

    // ----- Unbonding delegations -----

    pub fn unbonding_delegation(
        &self,
        delegator: &AccountId,
        validator: &AccountId,
    ) -> Option<&UnbondingDelegation> {
        self.unbonding_delegations.get(&(*delegator, *validator))
    }

    pub fn unbonding_delegations(&self) -> impl Iterator<Item = &UnbondingDelegation> {
        self.unbonding_delegations.values()
    }

    /// Writes an unbonding record and re-derives its queue slots; a record
    /// without entries is deleted.
    pub(crate) fn set_unbonding_delegation(&mut self, ubd: UnbondingDelegation) {
        let key = (ubd.delegator, ubd.validator);
        let old_times: BTreeSet<Timestamp> = self
            .unbonding_delegations
            .get(&key)
            .map(|old| old.entries.iter().map(|e| e.completion_time).collect())
            .unwrap_or_default();
        let new_times: BTreeSet<Timestamp> =
            ubd.entries.iter().map(|e| e.completion_time).collect();

        for time in old_times.difference(&new_times) {
            queue_remove(&mut self.indexes.unbonding_queue, *time, &key);
        }
        for time in &new_times {
            queue_insert(&mut self.indexes.unbonding_queue, *time, key);
        }

        if ubd.entries.is_empty() {
            self.unbonding_delegations.remove(&key);
        } else {
            self.unbonding_delegations.insert(key, ubd);
        }
    }

    // ----- Redelegations -----

    pub fn redelegation(
        &self,
        delegator: &AccountId,
        src: &AccountId,
        dst: &AccountId,
    ) -> Option<&Redelegation> {
        self.redelegations.get(&(*delegator, *src, *dst))
    }

    pub fn redelegations(&self) -> impl Iterator<Item = &Redelegation> {
        self.redelegations.values()
    }

    /// True if the delegator has a live redelegation landing on `dst`.
    pub fn has_receiving_redelegation(&self, delegator: &AccountId, dst: &AccountId) -> bool {
        self.indexes
            .redelegations_by_dst
            .get(&(*delegator, *dst))
            .map_or(false, |sources| !sources.is_empty())
    }

    pub(crate) fn set_redelegation(&mut self, red: Redelegation) {
        let key = (red.delegator, red.src, red.dst);
        let old_times: BTreeSet<Timestamp> = self
            .redelegations
            .get(&key)
            .map(|old| old.entries.iter().map(|e| e.completion_time).collect())
            .unwrap_or_default();
        let new_times: BTreeSet<Timestamp> =
            red.entries.iter().map(|e| e.completion_time).collect();

        for time in old_times.difference(&new_times) {
            queue_remove(&mut self.indexes.redelegation_queue, *time, &key);
        }
        for time in &new_times {
            queue_insert(&mut self.indexes.redelegation_queue, *time, key);
        }

        if red.entries.is_empty() {
            queue_remove(
                &mut self.indexes.redelegations_by_dst,
                (red.delegator, red.dst),
                &red.src,
            );
            self.redelegations.remove(&key);
        } else {
            queue_insert(
                &mut self.indexes.redelegations_by_dst,
                (red.delegator, red.dst),
                red.src,
            );
            self.redelegations.insert(key, red);
        }
    }

    // ----- Derived indexes -----

    /// Recomputes every derived index from the primary tables.
    pub fn derive_indexes(&self) -> QueueIndexes {
        let mut indexes = QueueIndexes::default();
        for (key, ubd) in &self.unbonding_delegations {
            for entry in &ubd.entries {
                queue_insert(&mut indexes.unbonding_queue, entry.completion_time, *key);
            }
        }
        for (key, red) in &self.redelegations {
            for entry in &red.entries {
                queue_insert(&mut indexes.redelegation_queue, entry.completion_time, *key);
            }
            if !red.entries.is_empty() {
                queue_insert(
                    &mut indexes.redelegations_by_dst,
                    (red.delegator, red.dst),
                    red.src,
                );
            }
        }
        for validator in self.validators.values() {
            if validator.status == BondStatus::Unbonding {
                queue_insert(
                    &mut indexes.validator_queue,
                    validator.unbonding_time,
                    validator.operator,
                );
            }
        }
        indexes
    }

    pub fn rebuild_indexes(&mut self) {
        self.indexes = self.derive_indexes();
        self.validators_by_cons_key = self
            .validators
            .values()
            .map(|v| (v.consensus_pubkey, v.operator))
            .collect();
    }
}
