// Params - Paramètres du module de staking (modifiables par la gouvernance)
use super::error::{StakingError, StakingResult};
use crate::types::{Balance, Rate, Timestamp, MICROKRAT};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Durée d'unbonding par défaut: 21 jours
pub const DEFAULT_UNBONDING_TIME: Timestamp = 21 * 24 * 3600;

pub const DEFAULT_MAX_VALIDATORS: u32 = 100;

/// Entrées simultanées par paire (unbonding) ou triplet (redelegation)
pub const DEFAULT_MAX_ENTRIES: u32 = 7;

pub const DEFAULT_HISTORICAL_ENTRIES: u32 = 10_000;

pub const DEFAULT_BOND_DENOM: &str = "ukrat";

/// 1 unité de puissance de vote = 10^6 unités de base
pub const DEFAULT_POWER_REDUCTION: Balance = MICROKRAT;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Seconds between an undelegation and the release of its tokens
    pub unbonding_time: Timestamp,
    pub max_validators: u32,
    pub max_entries: u32,
    pub historical_entries: u32,
    pub bond_denom: String,
    pub min_commission_rate: Rate,
    /// Token amount per unit of consensus voting power
    pub power_reduction: Balance,
}

impl Params {
    pub fn validate(&self) -> StakingResult<()> {
        if self.unbonding_time == 0 {
            return Err(StakingError::InvalidParams("unbonding_time must be positive"));
        }
        if self.max_validators == 0 {
            return Err(StakingError::InvalidParams("max_validators must be positive"));
        }
        if self.max_entries == 0 {
            return Err(StakingError::InvalidParams("max_entries must be positive"));
        }
        if self.bond_denom.trim().is_empty() {
            return Err(StakingError::InvalidParams("bond_denom cannot be blank"));
        }
        if self.min_commission_rate < Decimal::ZERO || self.min_commission_rate > Decimal::ONE {
            return Err(StakingError::InvalidParams(
                "min_commission_rate must be within [0, 1]",
            ));
        }
        if self.power_reduction == 0 {
            return Err(StakingError::InvalidParams("power_reduction must be positive"));
        }
        Ok(())
    }

    /// Puissance de consensus: floor(tokens / power_reduction)
    pub fn consensus_power(&self, tokens: Balance) -> u64 {
        let power = tokens / self.power_reduction.max(1);
        u64::try_from(power).unwrap_or(u64::MAX)
    }

    /// Inverse of `consensus_power`, for tests and tooling.
    pub fn tokens_from_consensus_power(&self, power: u64) -> Balance {
        Balance::from(power).saturating_mul(self.power_reduction)
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            unbonding_time: DEFAULT_UNBONDING_TIME,
            max_validators: DEFAULT_MAX_VALIDATORS,
            max_entries: DEFAULT_MAX_ENTRIES,
            historical_entries: DEFAULT_HISTORICAL_ENTRIES,
            bond_denom: DEFAULT_BOND_DENOM.to_string(),
            min_commission_rate: Decimal::ZERO,
            power_reduction: DEFAULT_POWER_REDUCTION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_params_are_valid() {
        let params = Params::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.unbonding_time, 1_814_400);
        assert_eq!(params.max_entries, 7);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut params = Params::default();
        params.max_validators = 0;
        assert!(params.validate().is_err());

        let mut params = Params::default();
        params.min_commission_rate = dec!(1.01);
        assert!(params.validate().is_err());

        let mut params = Params::default();
        params.min_commission_rate = dec!(-0.01);
        assert!(params.validate().is_err());

        let mut params = Params::default();
        params.bond_denom = " ".to_string();
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_consensus_power() {
        let params = Params::default();
        assert_eq!(params.consensus_power(2_999_999), 2);
        assert_eq!(params.tokens_from_consensus_power(3), 3_000_000);
    }

    #[test]
    fn test_params_json_round_trip() {
        let params = Params {
            max_validators: 777,
            ..Params::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        let decoded: Params = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, params);
    }
}
