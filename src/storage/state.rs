// State - Persistance du ledger de staking dans RocksDB
// Principe: Un commit = un batch atomique, les index dérivés ne sont jamais stockés
use super::db::{Database, DatabaseError, WriteOp};
use crate::staking::{
    Delegation, HistoricalInfo, Params, Redelegation, StakingState, UnbondingDelegation, Validator,
};
use crate::types::{AccountId, BlockNumber};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Storage key prefixes
const PREFIX_VALIDATOR: &[u8] = b"validator:";
const PREFIX_CONS_KEY: &[u8] = b"cons_key:";
const PREFIX_DELEGATION: &[u8] = b"delegation:";
const PREFIX_UNBONDING: &[u8] = b"unbonding:";
const PREFIX_REDELEGATION: &[u8] = b"redelegation:";
const PREFIX_LAST_POWER: &[u8] = b"last_power:";
const PREFIX_HISTORICAL: &[u8] = b"historical:";
const KEY_PARAMS: &[u8] = b"params";
const KEY_COMMITTED_HEIGHT: &[u8] = b"committed_height";

const TABLE_PREFIXES: [&[u8]; 7] = [
    PREFIX_VALIDATOR,
    PREFIX_CONS_KEY,
    PREFIX_DELEGATION,
    PREFIX_UNBONDING,
    PREFIX_REDELEGATION,
    PREFIX_LAST_POWER,
    PREFIX_HISTORICAL,
];

fn key(prefix: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    let mut key = prefix.to_vec();
    for part in parts {
        key.extend_from_slice(part);
    }
    key
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StateError> {
    bincode::serialize(value).map_err(|e| StateError::SerializationFailed(e.to_string()))
}

fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, StateError> {
    bincode::deserialize(data).map_err(|e| StateError::DeserializationFailed(e.to_string()))
}

/// Backend persistant du ledger de staking
///
/// NOT thread-safe: one writer, called once per committed block.
pub struct StateDb {
    db: Database,
}

impl StateDb {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Dernière hauteur committée
    pub fn committed_height(&self) -> Result<Option<BlockNumber>, StateError> {
        match self.db.get(KEY_COMMITTED_HEIGHT)? {
            Some(data) => Ok(Some(decode(&data)?)),
            None => Ok(None),
        }
    }

    /// Écrit l'état complet à `height` dans un seul batch; les lignes
    /// absentes de `state` sont supprimées.
    pub fn commit(&self, state: &StakingState, height: BlockNumber) -> Result<(), StateError> {
        let mut rows: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

        for (operator, validator) in &state.validators {
            rows.insert(key(PREFIX_VALIDATOR, &[operator.as_bytes()]), encode(validator)?);
        }
        for (cons_key, operator) in &state.validators_by_cons_key {
            rows.insert(key(PREFIX_CONS_KEY, &[cons_key.as_bytes()]), encode(operator)?);
        }
        for ((delegator, validator), delegation) in &state.delegations {
            rows.insert(
                key(PREFIX_DELEGATION, &[delegator.as_bytes(), validator.as_bytes()]),
                encode(delegation)?,
            );
        }
        for ((delegator, validator), ubd) in &state.unbonding_delegations {
            rows.insert(
                key(PREFIX_UNBONDING, &[delegator.as_bytes(), validator.as_bytes()]),
                encode(ubd)?,
            );
        }
        for ((delegator, src, dst), red) in &state.redelegations {
            rows.insert(
                key(
                    PREFIX_REDELEGATION,
                    &[delegator.as_bytes(), src.as_bytes(), dst.as_bytes()],
                ),
                encode(red)?,
            );
        }
        for (operator, power) in &state.last_validator_powers {
            rows.insert(key(PREFIX_LAST_POWER, &[operator.as_bytes()]), encode(power)?);
        }
        for (h, info) in &state.historical_info {
            // Big-endian: l'ordre des clés suit l'ordre des hauteurs
            rows.insert(key(PREFIX_HISTORICAL, &[&h.to_be_bytes()]), encode(info)?);
        }

        let mut ops = Vec::with_capacity(rows.len() + 2);
        let mut deleted = 0usize;
        for prefix in TABLE_PREFIXES {
            for (existing, _) in self.db.scan_prefix(prefix)? {
                if !rows.contains_key(&existing) {
                    ops.push(WriteOp::Delete { key: existing });
                    deleted += 1;
                }
            }
        }
        let written = rows.len();
        ops.extend(rows.into_iter().map(|(key, value)| WriteOp::Put { key, value }));
        ops.push(WriteOp::Put {
            key: KEY_PARAMS.to_vec(),
            value: encode(&state.params)?,
        });
        ops.push(WriteOp::Put {
            key: KEY_COMMITTED_HEIGHT.to_vec(),
            value: encode(&height)?,
        });

        self.db.batch_write(ops)?;
        debug!(height, written, deleted, "Staking state committed");
        Ok(())
    }

    /// Relit l'état committé; None si rien n'a jamais été committé.
    pub fn load(&self) -> Result<Option<StakingState>, StateError> {
        let params: Params = match self.db.get(KEY_PARAMS)? {
            Some(data) => decode(&data)?,
            None => return Ok(None),
        };
        let mut state = StakingState::new(params);

        for (_, data) in self.db.scan_prefix(PREFIX_VALIDATOR)? {
            let validator: Validator = decode(&data)?;
            state.validators.insert(validator.operator, validator);
        }
        for (_, data) in self.db.scan_prefix(PREFIX_DELEGATION)? {
            let delegation: Delegation = decode(&data)?;
            state
                .delegations
                .insert((delegation.delegator, delegation.validator), delegation);
        }
        for (_, data) in self.db.scan_prefix(PREFIX_UNBONDING)? {
            let ubd: UnbondingDelegation = decode(&data)?;
            state
                .unbonding_delegations
                .insert((ubd.delegator, ubd.validator), ubd);
        }
        for (_, data) in self.db.scan_prefix(PREFIX_REDELEGATION)? {
            let red: Redelegation = decode(&data)?;
            state
                .redelegations
                .insert((red.delegator, red.src, red.dst), red);
        }
        for (row_key, data) in self.db.scan_prefix(PREFIX_LAST_POWER)? {
            let operator = operator_from_key(&row_key[PREFIX_LAST_POWER.len()..])?;
            state.last_validator_powers.insert(operator, decode(&data)?);
        }
        for (_, data) in self.db.scan_prefix(PREFIX_HISTORICAL)? {
            let info: HistoricalInfo = decode(&data)?;
            state.historical_info.insert(info.header.height, info);
        }

        // Index de clés de consensus et files: reconstruits, jamais relus
        state.rebuild_indexes();
        info!(
            validators = state.validators.len(),
            delegations = state.delegations.len(),
            "Staking state loaded"
        );
        Ok(Some(state))
    }
}

fn operator_from_key(suffix: &[u8]) -> Result<AccountId, StateError> {
    let bytes: [u8; 32] = suffix
        .try_into()
        .map_err(|_| StateError::CorruptKey(hex::encode(suffix)))?;
    Ok(AccountId::from_bytes(bytes))
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Erreur de base de données: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Échec de sérialisation: {0}")]
    SerializationFailed(String),

    #[error("Échec de désérialisation: {0}")]
    DeserializationFailed(String),

    #[error("Clé corrompue: {0}")]
    CorruptKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staking::{
        CommissionRates, Description, MemoryBank, NewValidator, StakingKeeper,
    };
    use crate::types::{BlockContext, BlockHeader, ConsensusPubKey, Hash};
    use ed25519_dalek::SigningKey;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn keeper_with_validator() -> (StakingKeeper<MemoryBank>, AccountId, AccountId) {
        let params = Params {
            power_reduction: 1,
            ..Params::default()
        };
        let operator = AccountId::from_bytes([1; 32]);
        let delegator = AccountId::from_bytes([2; 32]);
        let mut bank = MemoryBank::new();
        bank.mint(operator, 1_000);
        bank.mint(delegator, 1_000);

        let mut keeper = StakingKeeper::new(params, bank).unwrap();
        let ctx = BlockContext::new(1, 1_000);
        keeper
            .create_validator(
                &ctx,
                NewValidator {
                    operator,
                    consensus_pubkey: ConsensusPubKey::from_verifying_key(
                        &SigningKey::from_bytes(&[1; 32]).verifying_key(),
                    ),
                    description: Description::new("alpha"),
                    commission: CommissionRates::new(dec!(0.1), dec!(0.2), dec!(0.01)),
                    min_self_delegation: 10,
                    self_delegation: 100,
                },
            )
            .unwrap();
        keeper.delegate(&ctx, &delegator, &operator, 50).unwrap();
        keeper
            .end_block(&BlockHeader {
                height: 1,
                time: 1_000,
                chain_id: "kratos-test".to_string(),
                app_hash: Hash::ZERO,
            })
            .unwrap();
        (keeper, operator, delegator)
    }

    #[test]
    fn test_empty_db_loads_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateDb::new(Database::open(temp_dir.path()).unwrap());
        assert!(store.load().unwrap().is_none());
        assert_eq!(store.committed_height().unwrap(), None);
    }

    #[test]
    fn test_commit_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateDb::new(Database::open(temp_dir.path()).unwrap());
        let (mut keeper, operator, delegator) = keeper_with_validator();
        keeper
            .undelegate(&BlockContext::new(2, 1_010), &delegator, &operator, 20)
            .unwrap();

        store.commit(keeper.state(), 2).unwrap();
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(&loaded, keeper.state());
        assert_eq!(loaded.indexes(), keeper.state().indexes());
        assert_eq!(store.committed_height().unwrap(), Some(2));
        assert_eq!(loaded.params().min_commission_rate, Decimal::ZERO);
    }

    #[test]
    fn test_commit_deletes_stale_rows() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateDb::new(Database::open(temp_dir.path()).unwrap());
        let (mut keeper, operator, delegator) = keeper_with_validator();
        store.commit(keeper.state(), 1).unwrap();

        // Le délégateur sort entièrement: la ligne de délégation disparaît
        keeper
            .undelegate(&BlockContext::new(2, 1_010), &delegator, &operator, 50)
            .unwrap();
        store.commit(keeper.state(), 2).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert!(loaded.delegation(&delegator, &operator).is_none());
        assert!(loaded.unbonding_delegation(&delegator, &operator).is_some());
        assert_eq!(&loaded, keeper.state());
    }
}
