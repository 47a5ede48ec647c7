// Validator - Enregistrement d'un validateur et de sa commission
use super::bank::PoolKind;
use super::error::{StakingError, StakingResult};
use crate::types::{
    AccountId, Balance, BlockNumber, ConsensusPubKey, Rate, Shares, Timestamp, SECONDS_PER_DAY,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const MAX_MONIKER_LENGTH: usize = 70;
pub const MAX_IDENTITY_LENGTH: usize = 3000;
pub const MAX_WEBSITE_LENGTH: usize = 140;
pub const MAX_SECURITY_CONTACT_LENGTH: usize = 140;
pub const MAX_DETAILS_LENGTH: usize = 280;

/// Statut de bonding d'un validateur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BondStatus {
    /// Hors du set actif, aucun unbonding en cours
    Unbonded,
    /// Sorti du set actif, en attente de `unbonding_time`
    Unbonding,
    /// Dans le set actif, participe au consensus
    Bonded,
}

/// Description lisible d'un validateur
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub moniker: String,
    pub identity: String,
    pub website: String,
    pub security_contact: String,
    pub details: String,
}

/// Partial description edit; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptionUpdate {
    pub moniker: Option<String>,
    pub identity: Option<String>,
    pub website: Option<String>,
    pub security_contact: Option<String>,
    pub details: Option<String>,
}

impl Description {
    pub fn new(moniker: impl Into<String>) -> Self {
        Self {
            moniker: moniker.into(),
            ..Self::default()
        }
    }

    pub fn ensure_length(&self) -> StakingResult<()> {
        let fields = [
            ("moniker", &self.moniker, MAX_MONIKER_LENGTH),
            ("identity", &self.identity, MAX_IDENTITY_LENGTH),
            ("website", &self.website, MAX_WEBSITE_LENGTH),
            ("security_contact", &self.security_contact, MAX_SECURITY_CONTACT_LENGTH),
            ("details", &self.details, MAX_DETAILS_LENGTH),
        ];
        for (field, value, max) in fields {
            if value.chars().count() > max {
                return Err(StakingError::DescriptionTooLong { field, max });
            }
        }
        Ok(())
    }

    /// Applies an edit and validates the result.
    pub fn updated(&self, update: &DescriptionUpdate) -> StakingResult<Description> {
        let pick = |new: &Option<String>, old: &String| new.clone().unwrap_or_else(|| old.clone());
        let description = Description {
            moniker: pick(&update.moniker, &self.moniker),
            identity: pick(&update.identity, &self.identity),
            website: pick(&update.website, &self.website),
            security_contact: pick(&update.security_contact, &self.security_contact),
            details: pick(&update.details, &self.details),
        };
        description.ensure_length()?;
        Ok(description)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRates {
    pub rate: Rate,
    pub max_rate: Rate,
    pub max_change_rate: Rate,
}

impl CommissionRates {
    pub fn new(rate: Rate, max_rate: Rate, max_change_rate: Rate) -> Self {
        Self {
            rate,
            max_rate,
            max_change_rate,
        }
    }

    /// 0 <= rate <= max_rate <= 1 et 0 <= max_change_rate <= max_rate
    pub fn validate(&self) -> StakingResult<()> {
        if self.max_rate < Decimal::ZERO {
            return Err(StakingError::CommissionInvalid("max rate is negative"));
        }
        if self.max_rate > Decimal::ONE {
            return Err(StakingError::CommissionInvalid("max rate exceeds 100%"));
        }
        if self.rate < Decimal::ZERO {
            return Err(StakingError::CommissionInvalid("rate is negative"));
        }
        if self.rate > self.max_rate {
            return Err(StakingError::CommissionInvalid("rate exceeds max rate"));
        }
        if self.max_change_rate < Decimal::ZERO {
            return Err(StakingError::CommissionInvalid("max change rate is negative"));
        }
        if self.max_change_rate > self.max_rate {
            return Err(StakingError::CommissionInvalid("max change rate exceeds max rate"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commission {
    pub rates: CommissionRates,
    /// Block time of the last rate change
    pub update_time: Timestamp,
}

impl Commission {
    pub fn new(rates: CommissionRates, update_time: Timestamp) -> Self {
        Self { rates, update_time }
    }

    pub fn rate(&self) -> Rate {
        self.rates.rate
    }

    /// Checks a rate change requested at `now`.
    pub fn validate_new_rate(
        &self,
        new_rate: Rate,
        min_rate: Rate,
        now: Timestamp,
    ) -> StakingResult<()> {
        if now.saturating_sub(self.update_time) < SECONDS_PER_DAY {
            return Err(StakingError::CommissionUpdateTooFrequent {
                last_update: self.update_time,
            });
        }
        if new_rate < Decimal::ZERO {
            return Err(StakingError::CommissionInvalid("rate is negative"));
        }
        if new_rate > self.rates.max_rate {
            return Err(StakingError::CommissionRateTooHigh {
                rate: new_rate,
                max_rate: self.rates.max_rate,
            });
        }
        if new_rate < min_rate {
            return Err(StakingError::CommissionRateTooLow {
                rate: new_rate,
                min: min_rate,
            });
        }
        let change = (new_rate - self.rates.rate).abs();
        if change > self.rates.max_change_rate {
            return Err(StakingError::CommissionChangeTooLarge {
                change,
                max_change_rate: self.rates.max_change_rate,
            });
        }
        Ok(())
    }
}

/// Informations d'un validateur
///
/// `tokens` and `delegator_shares` are only changed through the exchange-rate
/// methods in `exchange.rs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub operator: AccountId,
    pub consensus_pubkey: ConsensusPubKey,
    pub jailed: bool,
    pub status: BondStatus,
    pub tokens: Balance,
    pub delegator_shares: Shares,
    pub description: Description,
    /// Hauteur à laquelle l'unbonding du validateur a commencé
    pub unbonding_height: BlockNumber,
    /// Temps auquel l'unbonding du validateur sera complété
    pub unbonding_time: Timestamp,
    pub commission: Commission,
    pub min_self_delegation: Balance,
}

impl Validator {
    pub fn new(
        operator: AccountId,
        consensus_pubkey: ConsensusPubKey,
        description: Description,
        commission: Commission,
        min_self_delegation: Balance,
    ) -> Self {
        Self {
            operator,
            consensus_pubkey,
            jailed: false,
            status: BondStatus::Unbonded,
            tokens: 0,
            delegator_shares: Shares::ZERO,
            description,
            unbonding_height: 0,
            unbonding_time: 0,
            commission,
            min_self_delegation,
        }
    }

    pub fn is_bonded(&self) -> bool {
        self.status == BondStatus::Bonded
    }

    pub fn is_unbonding(&self) -> bool {
        self.status == BondStatus::Unbonding
    }

    pub fn is_unbonded(&self) -> bool {
        self.status == BondStatus::Unbonded
    }

    /// Pool holding this validator's tokens.
    pub fn pool(&self) -> PoolKind {
        if self.is_bonded() {
            PoolKind::Bonded
        } else {
            PoolKind::NotBonded
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens == 0 && self.delegator_shares.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn commission(rate: Rate, max: Rate, change: Rate) -> Commission {
        Commission::new(CommissionRates::new(rate, max, change), 0)
    }

    #[test]
    fn test_commission_rates_validation() {
        assert!(CommissionRates::new(dec!(0.1), dec!(0.2), dec!(0.01)).validate().is_ok());
        assert!(CommissionRates::new(dec!(0.3), dec!(0.2), dec!(0.01)).validate().is_err());
        assert!(CommissionRates::new(dec!(0.1), dec!(1.5), dec!(0.01)).validate().is_err());
        assert!(CommissionRates::new(dec!(-0.1), dec!(0.2), dec!(0.01)).validate().is_err());
        assert!(CommissionRates::new(dec!(0.1), dec!(0.2), dec!(0.3)).validate().is_err());
    }

    #[test]
    fn test_commission_change_cadence() {
        let c = commission(dec!(0.10), dec!(0.50), dec!(0.01));

        let err = c.validate_new_rate(dec!(0.11), Decimal::ZERO, 3_600).unwrap_err();
        assert!(matches!(err, StakingError::CommissionUpdateTooFrequent { .. }));

        assert!(c.validate_new_rate(dec!(0.11), Decimal::ZERO, SECONDS_PER_DAY).is_ok());

        let err = c
            .validate_new_rate(dec!(0.12), Decimal::ZERO, SECONDS_PER_DAY)
            .unwrap_err();
        assert!(matches!(err, StakingError::CommissionChangeTooLarge { .. }));

        let err = c
            .validate_new_rate(dec!(0.60), Decimal::ZERO, SECONDS_PER_DAY)
            .unwrap_err();
        assert!(matches!(err, StakingError::CommissionRateTooHigh { .. }));

        let err = c
            .validate_new_rate(dec!(0.095), dec!(0.10), SECONDS_PER_DAY)
            .unwrap_err();
        assert!(matches!(err, StakingError::CommissionRateTooLow { .. }));
    }

    #[test]
    fn test_description_update() {
        let desc = Description::new("alpha");
        let update = DescriptionUpdate {
            website: Some("https://kratos.example".to_string()),
            ..DescriptionUpdate::default()
        };
        let updated = desc.updated(&update).unwrap();
        assert_eq!(updated.moniker, "alpha");
        assert_eq!(updated.website, "https://kratos.example");

        let too_long = DescriptionUpdate {
            moniker: Some("m".repeat(MAX_MONIKER_LENGTH + 1)),
            ..DescriptionUpdate::default()
        };
        assert!(matches!(
            desc.updated(&too_long),
            Err(StakingError::DescriptionTooLong { field: "moniker", .. })
        ));
    }
}
