//! Fixed-point amounts and asset identifiers.
//!
//! Amounts are signed 64-bit integers with 8 implied decimal places. Wire values
//! may be negative (and are rejected by validation); stored balances never are.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an issued asset. The base asset pays fees.
pub type AssetId = u64;

/// The asset in which fees are paid and references are initialised.
pub const BASE_ASSET: AssetId = 0;

/// An amount in the smallest unit (1e-8 of a whole unit).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Self = Self(0);

    /// Number of raw units in one whole unit.
    pub const UNIT: i64 = 100_000_000;

    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Whole units, e.g. `Amount::whole(3)` is 3.00000000.
    pub const fn whole(units: i64) -> Self {
        Self(units * Self::UNIT)
    }

    pub fn raw(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// True when the amount is a whole number of units (required by indivisible assets).
    pub fn is_whole(&self) -> bool {
        self.0 % Self::UNIT == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn checked_neg(self) -> Option<Self> {
        self.0.checked_neg().map(Self)
    }

    pub fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    /// `self * price / UNIT`, rounded down. `None` on overflow.
    pub fn mul_price_floor(self, price: Amount) -> Option<Self> {
        let product = (self.0 as i128).checked_mul(price.0 as i128)?;
        i64::try_from(product.div_euclid(Self::UNIT as i128))
            .ok()
            .map(Self)
    }

    /// `self * price / UNIT`, rounded up. `None` on overflow.
    pub fn mul_price_ceil(self, price: Amount) -> Option<Self> {
        let product = (self.0 as i128).checked_mul(price.0 as i128)?;
        let unit = Self::UNIT as i128;
        let q = product.div_euclid(unit);
        let q = if product.rem_euclid(unit) != 0 { q + 1 } else { q };
        i64::try_from(q).ok().map(Self)
    }

    /// Round down to the nearest multiple of `granularity` raw units.
    pub fn round_down_to(self, granularity: i64) -> Self {
        if granularity <= 1 {
            return self;
        }
        Self(self.0 - self.0.rem_euclid(granularity))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let unit = Self::UNIT as u64;
        write!(f, "{}{}.{:08}", sign, abs / unit, abs % unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_eight_decimals() {
        assert_eq!(Amount::new(150_000_000).to_string(), "1.50000000");
        assert_eq!(Amount::new(-1).to_string(), "-0.00000001");
    }

    #[test]
    fn price_rounding() {
        let amount = Amount::new(3);
        let price = Amount::new(50_000_000); // 0.5
        assert_eq!(amount.mul_price_floor(price), Some(Amount::new(1)));
        assert_eq!(amount.mul_price_ceil(price), Some(Amount::new(2)));
    }

    #[test]
    fn whole_units() {
        assert!(Amount::whole(2).is_whole());
        assert!(!Amount::new(1).is_whole());
    }

    #[test]
    fn round_down_to_granularity() {
        assert_eq!(Amount::new(1234).round_down_to(100), Amount::new(1200));
        assert_eq!(Amount::new(1234).round_down_to(1), Amount::new(1234));
    }
}
