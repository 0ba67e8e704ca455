//! Fixed-point ratio helpers for deterministic decisions.
//!
//! Thresholds such as "95% of capacity" or "stay weighted x1.8" are expressed
//! as fixed-point ratios so every comparison in the turn pipeline gives the
//! same answer on every platform.

use fixed::types::I32F32;

/// Fixed-point number used for all ratios and weighted scores.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Ratio = I32F32;

/// Convert a resource amount into a fixed-point score.
#[must_use]
#[inline]
pub fn amount(value: u32) -> Ratio {
    Ratio::from_num(value)
}

/// `value * ratio` as a fixed-point score.
#[must_use]
#[inline]
pub fn scaled(value: u32, ratio: Ratio) -> Ratio {
    amount(value) * ratio
}

/// Returns true if `value >= ratio * capacity`.
#[must_use]
pub fn reaches_fraction(value: u32, capacity: u32, ratio: Ratio) -> bool {
    amount(value) >= scaled(capacity, ratio)
}

/// Returns true if `value < ratio * capacity`.
#[must_use]
pub fn below_fraction(value: u32, capacity: u32, ratio: Ratio) -> bool {
    amount(value) < scaled(capacity, ratio)
}

/// Serde support for ratios.
///
/// Ratios are written as plain decimal numbers so config files stay
/// readable (`deposit_threshold: 0.95`). Conversion happens once at load
/// time; the engine only ever sees the fixed-point value.
pub mod ratio_serde {
    use super::Ratio;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a ratio as a decimal number.
    pub fn serialize<S>(value: &Ratio, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a ratio from a decimal number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Ratio, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = f64::deserialize(deserializer)?;
        Ratio::checked_from_num(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("ratio out of range: {raw}")))
    }
}
