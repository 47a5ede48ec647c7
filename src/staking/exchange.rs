// Exchange - Conversion tokens <-> parts d'un validateur
// Principe: Un seul point de passage pour tokens et delegator_shares
//
// Rounding: tokens -> shares truncates, shares -> tokens floors. A round trip
// therefore never returns more tokens than went in.
use super::error::{StakingError, StakingResult};
use super::validator::Validator;
use crate::types::{
    balance_to_decimal, decimal_to_balance_floor, mul_div_floor, Balance, Shares, SHARE_PRECISION,
};

impl Validator {
    /// Shares worth `amount` tokens at the current rate.
    pub fn shares_from_tokens(&self, amount: Balance) -> StakingResult<Shares> {
        if self.delegator_shares.is_zero() {
            return Shares::from_tokens(amount).ok_or(StakingError::ArithmeticOverflow);
        }
        if self.tokens == 0 {
            return Err(StakingError::InvalidExchangeRate(self.operator));
        }
        let amount = balance_to_decimal(amount).ok_or(StakingError::ArithmeticOverflow)?;
        let tokens = balance_to_decimal(self.tokens).ok_or(StakingError::ArithmeticOverflow)?;
        let shares = mul_div_floor(
            self.delegator_shares.as_decimal(),
            amount,
            tokens,
            SHARE_PRECISION,
        )
        .ok_or(StakingError::ArithmeticOverflow)?;
        Shares::from_decimal(shares).ok_or(StakingError::ArithmeticOverflow)
    }

    /// Tokens backing `shares`, floored.
    pub fn tokens_from_shares(&self, shares: Shares) -> StakingResult<Balance> {
        if self.delegator_shares.is_zero() {
            return Ok(0);
        }
        let tokens = balance_to_decimal(self.tokens).ok_or(StakingError::ArithmeticOverflow)?;
        let value = mul_div_floor(
            shares.as_decimal(),
            tokens,
            self.delegator_shares.as_decimal(),
            0,
        )
        .ok_or(StakingError::ArithmeticOverflow)?;
        decimal_to_balance_floor(value).ok_or(StakingError::ArithmeticOverflow)
    }

    /// Adds delegated tokens; returns the updated validator and the shares issued.
    pub fn add_tokens_from_del(&self, amount: Balance) -> StakingResult<(Validator, Shares)> {
        if amount == 0 {
            return Err(StakingError::InvalidAmount("delegation amount must be positive"));
        }
        let issued = self.shares_from_tokens(amount)?;
        if issued.is_zero() {
            return Err(StakingError::InvalidAmount("amount too small to issue shares"));
        }

        let mut updated = self.clone();
        updated.tokens = self
            .tokens
            .checked_add(amount)
            .ok_or(StakingError::ArithmeticOverflow)?;
        updated.delegator_shares = self
            .delegator_shares
            .checked_add(issued)
            .ok_or(StakingError::ArithmeticOverflow)?;
        Ok((updated, issued))
    }

    /// Removes delegator shares; returns the updated validator and the tokens
    /// they were worth. Removing the last share drains the whole pool.
    pub fn remove_del_shares(&self, shares: Shares) -> StakingResult<(Validator, Balance)> {
        let remaining = self.delegator_shares.checked_sub(shares).ok_or(
            StakingError::InsufficientShares {
                requested: shares,
                available: self.delegator_shares,
            },
        )?;

        let issued_tokens = if remaining.is_zero() {
            self.tokens
        } else {
            self.tokens_from_shares(shares)?
        };

        let mut updated = self.clone();
        updated.delegator_shares = remaining;
        updated.tokens = self.tokens - issued_tokens;
        Ok((updated, issued_tokens))
    }

    /// Burns tokens without touching shares (slashing).
    pub fn remove_tokens(&self, amount: Balance) -> Validator {
        let mut updated = self.clone();
        updated.tokens = self.tokens.saturating_sub(amount);
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staking::validator::{Commission, CommissionRates, Description};
    use crate::types::{AccountId, ConsensusPubKey};
    use ed25519_dalek::SigningKey;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn validator() -> Validator {
        let key = SigningKey::from_bytes(&[9u8; 32]).verifying_key();
        Validator::new(
            AccountId::from_bytes([9; 32]),
            ConsensusPubKey::from_verifying_key(&key),
            Description::new("v"),
            Commission::new(CommissionRates::new(Decimal::ZERO, Decimal::ONE, Decimal::ONE), 0),
            1,
        )
    }

    #[test]
    fn test_bootstrap_rate_is_one_to_one() {
        let (v, shares) = validator().add_tokens_from_del(100).unwrap();
        assert_eq!(shares, Shares::from_tokens(100).unwrap());
        assert_eq!(v.tokens, 100);
        assert_eq!(v.delegator_shares, shares);
    }

    #[test]
    fn test_rate_after_slash() {
        let (v, _) = validator().add_tokens_from_del(100).unwrap();
        // 100 parts pour 50 tokens: 1 token = 2 parts
        let v = v.remove_tokens(50);
        let (v, shares) = v.add_tokens_from_del(10).unwrap();
        assert_eq!(shares.as_decimal(), dec!(20));
        assert_eq!(v.tokens, 60);
        assert_eq!(v.tokens_from_shares(shares).unwrap(), 10);
    }

    #[test]
    fn test_remove_shares_floors_payout() {
        let (v, _) = validator().add_tokens_from_del(100).unwrap();
        let v = v.remove_tokens(1); // 99 tokens / 100 parts
        let (v, paid) = v
            .remove_del_shares(Shares::from_decimal(dec!(50)).unwrap())
            .unwrap();
        assert_eq!(paid, 49);
        assert_eq!(v.tokens, 50);
    }

    #[test]
    fn test_large_pool_payout_is_floored() {
        let (v, _) = validator().add_tokens_from_del(3_000_000_000_000_001).unwrap();
        let v = v.remove_tokens(2);
        let shares = Shares::from_decimal(dec!(1500000000.000001)).unwrap();
        assert_eq!(v.tokens_from_shares(shares).unwrap(), 1_499_999_999);

        let (after, paid) = v.remove_del_shares(shares).unwrap();
        assert_eq!(paid, 1_499_999_999);
        assert_eq!(after.tokens, 2_999_998_500_000_000);
    }

    #[test]
    fn test_remove_last_share_drains_pool() {
        let (v, _) = validator().add_tokens_from_del(100).unwrap();
        let v = v.remove_tokens(1);
        let (v, paid) = v.remove_del_shares(v.delegator_shares).unwrap();
        assert_eq!(paid, 99);
        assert!(v.is_empty());
    }

    #[test]
    fn test_remove_more_than_total_fails() {
        let (v, _) = validator().add_tokens_from_del(10).unwrap();
        let err = v
            .remove_del_shares(Shares::from_tokens(11).unwrap())
            .unwrap_err();
        assert!(matches!(err, StakingError::InsufficientShares { .. }));
    }

    #[test]
    fn test_zero_pool_with_shares_is_invalid_rate() {
        let (v, _) = validator().add_tokens_from_del(10).unwrap();
        let v = v.remove_tokens(10);
        assert!(matches!(
            v.shares_from_tokens(1),
            Err(StakingError::InvalidExchangeRate(_))
        ));
    }

    #[test]
    fn test_zero_amount_rejected() {
        assert!(matches!(
            validator().add_tokens_from_del(0),
            Err(StakingError::InvalidAmount(_))
        ));
    }
}
