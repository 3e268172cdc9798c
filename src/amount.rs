use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use std::fmt;
use std::ops::Add;
use std::ops::Sub;

/// Number of internal units in one whole currency unit (4 decimal places)
pub const UNITS_PER_WHOLE: i64 = 10_000;

/// Number of internal units in one cent
const UNITS_PER_CENT: i64 = 100;

/// Fixed-point money amount.
///
/// Balances, stakes and payouts are kept as integers with four decimal places so the
/// ledger identity `after = before - stake + payout` never drifts. Stakes are cent
/// precise, which keeps every table multiplier (hundredths) exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Largest stake a table may accept. Any stake up to this times any multiplier
    /// stays well inside the i64 range.
    pub const MAX_STAKE: Amount = Amount::from_whole(1_000_000_000);

    pub const fn from_units(units: i64) -> Self {
        Amount(units)
    }

    pub const fn units(&self) -> i64 {
        self.0
    }

    pub const fn from_cents(cents: i64) -> Self {
        Amount(cents * UNITS_PER_CENT)
    }

    pub const fn from_whole(whole: i64) -> Self {
        Amount(whole * UNITS_PER_WHOLE)
    }

    /// Convert a decimal number, rounding to the internal precision.
    ///
    /// Returns `None` for NaN, infinities and values outside the representable range.
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let units = (value * UNITS_PER_WHOLE as f64).round();
        if units.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Amount(units as i64))
    }

    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / UNITS_PER_WHOLE as f64
    }

    /// True when the amount carries no fraction below one cent
    pub fn is_cent_precise(&self) -> bool {
        self.0 % UNITS_PER_CENT == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Apply a payout multiplier. Exact for cent precise amounts.
    ///
    /// Saturates at the ends of the i64 range instead of wrapping.
    pub fn times(self, multiplier: Multiplier) -> Amount {
        let units = self.0 as i128 * multiplier.hundredths() as i128 / 100;
        Amount(units.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / UNITS_PER_WHOLE as u64;
        let fraction = abs % UNITS_PER_WHOLE as u64;
        if fraction % UNITS_PER_CENT as u64 == 0 {
            write!(f, "{sign}{whole}.{:02}", fraction / UNITS_PER_CENT as u64)
        } else {
            write!(f, "{sign}{whole}.{fraction:04}")
        }
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Amount::from_decimal(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {value}")))
    }
}

/// Payout multiplier applied to the stake, in hundredths (150 == 1.5x)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Multiplier(u32);

impl Multiplier {
    pub const LOSS: Multiplier = Multiplier(0);
    pub const PUSH: Multiplier = Multiplier(100);
    pub const X1_5: Multiplier = Multiplier(150);
    pub const X1_95: Multiplier = Multiplier(195);
    pub const X2: Multiplier = Multiplier(200);
    pub const X2_5: Multiplier = Multiplier(250);
    pub const X3: Multiplier = Multiplier(300);
    pub const X4: Multiplier = Multiplier(400);
    pub const X5: Multiplier = Multiplier(500);
    pub const X6: Multiplier = Multiplier(600);
    pub const X7: Multiplier = Multiplier(700);
    pub const X8: Multiplier = Multiplier(800);
    pub const X9: Multiplier = Multiplier(900);
    pub const X10: Multiplier = Multiplier(1000);
    pub const X36: Multiplier = Multiplier(3600);

    pub const fn from_hundredths(hundredths: u32) -> Self {
        Multiplier(hundredths)
    }

    /// Get the multiplier value in hundredths (e.g., 1.95 becomes 195)
    pub const fn hundredths(&self) -> u32 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.as_f64();
        if value.fract() != 0.0 {
            write!(f, "{value:.2}x")
        } else {
            write!(f, "{value:.0}x")
        }
    }
}
