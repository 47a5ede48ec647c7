// Decimal - Parts de délégation à précision fixe
// Principe: Aucune arithmétique flottante dans le ledger
use super::primitives::Balance;
use primitive_types::U512;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fractional digits kept on every share amount.
///
/// With 6 digits, any share value backing up to ~7.9e22 base units fits in
/// the 28 significant digits of `Decimal`, so share addition and subtraction
/// stay exact.
pub const SHARE_PRECISION: u32 = 6;

/// Taux (commission, fraction de slash), toujours dans [0, 1] une fois validé
pub type Rate = Decimal;

/// Claim on a validator's token pool, proportional to its delegator shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shares(Decimal);

impl Shares {
    pub const ZERO: Shares = Shares(Decimal::ZERO);

    /// Bootstrap conversion: one share per token.
    pub fn from_tokens(amount: Balance) -> Option<Self> {
        balance_to_decimal(amount).map(Shares)
    }

    /// Truncates toward zero at `SHARE_PRECISION`.
    pub fn from_decimal(value: Decimal) -> Option<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return None;
        }
        Some(Shares(value.round_dp_with_strategy(
            SHARE_PRECISION,
            RoundingStrategy::ToZero,
        )))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Shares) -> Option<Shares> {
        self.0.checked_add(other.0).map(Shares)
    }

    /// `None` on underflow: shares never go negative.
    pub fn checked_sub(self, other: Shares) -> Option<Shares> {
        if other.0 > self.0 {
            return None;
        }
        self.0.checked_sub(other.0).map(Shares)
    }

    /// `self * factor`, truncated to share precision.
    pub fn mul_truncate(self, factor: Decimal) -> Option<Shares> {
        mul_div_floor(self.0, factor, Decimal::ONE, SHARE_PRECISION).map(Shares)
    }
}

impl fmt::Display for Shares {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// Conversion exacte d'un montant entier vers `Decimal`
pub fn balance_to_decimal(amount: Balance) -> Option<Decimal> {
    let value = i128::try_from(amount).ok()?;
    Decimal::try_from_i128_with_scale(value, 0).ok()
}

/// Plancher d'un `Decimal` positif vers un montant entier
pub fn decimal_to_balance_floor(value: Decimal) -> Option<Balance> {
    let mut whole = value.floor();
    whole.rescale(0);
    Balance::try_from(whole.mantissa()).ok()
}

/// Plus grande échelle représentable par `Decimal`
const MAX_SCALE: u32 = 28;

/// `floor(a * b / c)` at `scale` fractional digits, computed exactly.
///
/// Operands are lifted to 512-bit integers so the product never loses digits.
/// `None` for a zero divisor, a negative operand or a result that does not
/// fit a `Decimal`.
pub fn mul_div_floor(a: Decimal, b: Decimal, c: Decimal, scale: u32) -> Option<Decimal> {
    if c.is_zero() || scale > MAX_SCALE {
        return None;
    }
    let (ma, sa) = unsigned_parts(a)?;
    let (mb, sb) = unsigned_parts(b)?;
    let (mc, sc) = unsigned_parts(c)?;

    // a*b/c = (ma*mb*10^sc) / (mc*10^(sa+sb)), décalé de `scale` chiffres
    let numerator = ma
        .checked_mul(mb)?
        .checked_mul(U512::exp10((sc + scale) as usize))?;
    let denominator = mc.checked_mul(U512::exp10((sa + sb) as usize))?;
    let quotient = numerator / denominator;

    if quotient > U512::from(i128::MAX as u128) {
        return None;
    }
    Decimal::try_from_i128_with_scale(quotient.low_u128() as i128, scale).ok()
}

fn unsigned_parts(value: Decimal) -> Option<(U512, u32)> {
    let mantissa = u128::try_from(value.mantissa()).ok()?;
    Some((U512::from(mantissa), value.scale()))
}

/// `floor(amount * rate)`, used for slashing.
pub fn mul_rate_floor(amount: Balance, rate: Rate) -> Option<Balance> {
    let value = mul_div_floor(balance_to_decimal(amount)?, rate, Decimal::ONE, 0)?;
    decimal_to_balance_floor(value)
}
