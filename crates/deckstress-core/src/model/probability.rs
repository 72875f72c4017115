use core::fmt;

use serde::{Serialize, Serializer};

use super::fixed::{Fixed6, SCALE};

const MICROS_PER_UNIT: u128 = SCALE as u128;

/// Probability in `[0, 1]`, held as integer millionths.
///
/// Values are only ever produced by exact rational rounding, so two runs over
/// the same integers always serialise to the same bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Probability(u32);

impl Probability {
    pub const ZERO: Probability = Probability(0);
    pub const ONE: Probability = Probability(SCALE as u32);

    pub fn from_micros(micros: u32) -> Self {
        Self(micros.min(SCALE as u32))
    }

    /// Rounds `numerator / denominator` half-up to six decimals, clamped to `[0, 1]`.
    /// Returns `None` on a zero denominator or arithmetic overflow.
    pub fn from_ratio(numerator: u128, denominator: u128) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        let numerator = numerator.min(denominator);
        let doubled = numerator.checked_mul(2 * MICROS_PER_UNIT)?;
        let rounded = doubled.checked_add(denominator)? / denominator.checked_mul(2)?;
        Some(Self(rounded.min(MICROS_PER_UNIT) as u32))
    }

    pub const fn micros(self) -> u32 {
        self.0
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Multiplies by `factor`, rounding half-up and clamping to `[0, 1]`.
    pub fn scale(self, factor: Fixed6) -> Self {
        let factor = factor.clamp_to(Fixed6::ZERO, Fixed6::ONE);
        let numerator = self.0 as u128 * factor.micros() as u128;
        Self::from_ratio(numerator, MICROS_PER_UNIT * MICROS_PER_UNIT).unwrap_or(Self::ZERO)
    }

    /// Divides by `1 + inflation`, rounding half-up. Negative inflation is treated as zero.
    pub fn deflate(self, inflation: Fixed6) -> Self {
        let inflation = inflation.micros().max(0) as u128;
        let numerator = self.0 as u128 * MICROS_PER_UNIT;
        let denominator = (MICROS_PER_UNIT + inflation) * MICROS_PER_UNIT;
        Self::from_ratio(numerator, denominator).unwrap_or(Self::ZERO)
    }

    /// Signed difference `self - before` in six-decimal units.
    pub fn delta_from(self, before: Probability) -> Fixed6 {
        Fixed6::from_micros(self.0 as i64 - before.0 as i64)
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.0 / SCALE as u32, self.0 % SCALE as u32)
    }
}

impl Serialize for Probability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}
