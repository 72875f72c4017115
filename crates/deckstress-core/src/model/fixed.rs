use core::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of fractional units per whole unit (six decimal places).
pub const SCALE: i64 = 1_000_000;

/// Decimal value with exactly six fractional digits, stored as integer millionths.
///
/// Every real-valued payload field (effective K, effective n, fractions,
/// penalties, inflation) passes through this type so arithmetic stays exact
/// and reproducible across platforms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed6(i64);

impl Fixed6 {
    pub const ZERO: Fixed6 = Fixed6(0);
    pub const ONE: Fixed6 = Fixed6(SCALE);

    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    pub const fn from_int(value: i64) -> Self {
        Self(value * SCALE)
    }

    /// Rounds half-up to six decimals. Returns `None` for non-finite or
    /// out-of-range input.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * SCALE as f64 + 0.5).floor();
        if scaled < i64::MIN as f64 || scaled > i64::MAX as f64 {
            return None;
        }
        Some(Self(scaled as i64))
    }

    pub const fn micros(self) -> i64 {
        self.0
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    pub fn clamp_to(self, lo: Fixed6, hi: Fixed6) -> Self {
        Self(self.0.clamp(lo.0, hi.0))
    }

    pub const fn floor_int(self) -> i64 {
        self.0.div_euclid(SCALE)
    }

    pub const fn is_integral(self) -> bool {
        self.0.rem_euclid(SCALE) == 0
    }

    pub fn saturating_sub(self, other: Fixed6) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Product rounded half-up back to six decimals.
    pub fn mul_round(self, other: Fixed6) -> Self {
        let product = self.0 as i128 * other.0 as i128;
        let rounded = (product + (SCALE as i128) / 2).div_euclid(SCALE as i128);
        Self(rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }
}

impl fmt::Display for Fixed6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / SCALE as u64;
        let frac = abs % SCALE as u64;
        if frac == 0 {
            return write!(f, "{sign}{whole}");
        }
        let digits = format!("{frac:06}");
        write!(f, "{sign}{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl Serialize for Fixed6 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Fixed6 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        Fixed6::from_f64(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("value {raw} is not representable")))
    }
}
