// Historical - Instantanés bornés des sets de validateurs passés
use super::bank::BankKeeper;
use super::error::{StakingError, StakingResult};
use super::keeper::StakingKeeper;
use super::validator::Validator;
use crate::types::{BlockHeader, BlockNumber, Hash};
use serde::{Deserialize, Serialize};

/// Header and bonded validator set recorded at one height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalInfo {
    pub header: BlockHeader,
    /// Bonded validators, by power descending then operator ascending
    pub valset: Vec<Validator>,
}

impl HistoricalInfo {
    /// Blake3 over the bincode encoding of the validator set.
    pub fn valset_hash(&self) -> StakingResult<Hash> {
        let encoded = bincode::serialize(&self.valset)
            .map_err(|e| StakingError::InvariantViolation(format!("valset encoding: {e}")))?;
        Ok(Hash::hash(&encoded))
    }
}

impl<B: BankKeeper> StakingKeeper<B> {
    pub fn historical_info(&self, height: BlockNumber) -> Option<&HistoricalInfo> {
        self.state.historical_info.get(&height)
    }

    /// Stores the snapshot for `header.height` and evicts everything older
    /// than the last `historical_entries` heights.
    pub(crate) fn track_historical_info(&mut self, header: &BlockHeader) -> StakingResult<()> {
        let entries = BlockNumber::from(self.state.params.historical_entries);

        // Heights <= height - entries fall outside the window
        let history = &mut self.state.historical_info;
        if let Some(cutoff) = header.height.checked_sub(entries) {
            let kept = history.split_off(&cutoff.saturating_add(1));
            *history = kept;
        }
        if entries == 0 {
            return Ok(());
        }

        let mut valset = Vec::with_capacity(self.state.last_validator_powers.len());
        for operator in self.state.last_validator_powers.keys() {
            if let Some(validator) = self.state.validator(operator) {
                valset.push(validator.clone());
            }
        }
        let params = &self.state.params;
        valset.sort_by(|a, b| {
            params
                .consensus_power(b.tokens)
                .cmp(&params.consensus_power(a.tokens))
                .then_with(|| a.operator.cmp(&b.operator))
        });

        self.state.historical_info.insert(
            header.height,
            HistoricalInfo {
                header: header.clone(),
                valset,
            },
        );
        Ok(())
    }
}
