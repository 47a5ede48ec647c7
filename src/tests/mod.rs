// Tests module
// Scénarios inter-modules du ledger de staking, plus tests de propriétés

pub mod slashing;

use crate::staking::{
    CommissionRates, Description, MemoryBank, NewValidator, Params, StakingKeeper,
};
use crate::types::{AccountId, Balance, BlockContext, BlockHeader, ConsensusPubKey, Hash};
use ed25519_dalek::SigningKey;
use rust_decimal_macros::dec;

pub(crate) const UNBONDING_TIME: u64 = 1_000;
pub(crate) const GENESIS_TIME: u64 = 10_000;
pub(crate) const STARTING_BALANCE: Balance = 1_000_000;

// ===== HELPER FUNCTIONS =====

pub(crate) fn account(n: u8) -> AccountId {
    AccountId::from_bytes([n; 32])
}

pub(crate) fn cons_key(n: u8) -> ConsensusPubKey {
    ConsensusPubKey::from_verifying_key(&SigningKey::from_bytes(&[n; 32]).verifying_key())
}

/// One token = one unit of power, short unbonding period.
pub(crate) fn test_params() -> Params {
    Params {
        unbonding_time: UNBONDING_TIME,
        max_validators: 10,
        max_entries: 7,
        power_reduction: 1,
        ..Params::default()
    }
}

/// Keeper on a fresh bank where accounts 1..=40 hold `STARTING_BALANCE`.
pub(crate) fn new_keeper(params: Params) -> StakingKeeper<MemoryBank> {
    let mut bank = MemoryBank::new();
    for n in 1..=40 {
        bank.mint(account(n), STARTING_BALANCE);
    }
    StakingKeeper::new(params, bank).unwrap()
}

pub(crate) fn new_validator(n: u8, self_delegation: Balance) -> NewValidator {
    NewValidator {
        operator: account(n),
        consensus_pubkey: cons_key(n),
        description: Description::new(format!("validator-{n}")),
        commission: CommissionRates::new(dec!(0.10), dec!(0.20), dec!(0.01)),
        min_self_delegation: 1,
        self_delegation,
    }
}

pub(crate) fn header(height: u64, time: u64) -> BlockHeader {
    BlockHeader {
        height,
        time,
        chain_id: "kratos-staking-test".to_string(),
        app_hash: Hash::ZERO,
    }
}

pub(crate) fn ctx(height: u64, time: u64) -> BlockContext {
    BlockContext::new(height, time)
}
