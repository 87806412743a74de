//! Interaction score computation
//!
//! An entity's closeness score is the sum of its interactions' weights,
//! each attenuated by how long ago the interaction happened. The decay
//! curve and its rate are global settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds in one day
pub const MS_PER_DAY: f64 = 86_400_000.0;

/// Weight used when an interaction's type cannot be resolved
pub const DEFAULT_WEIGHT: u32 = 1;

/// Shape of the decay curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayType {
    /// `max(0, 1 - f * age)`
    #[default]
    Linear,
    /// `e^(-f * age)`
    Exponential,
    /// `max(0, 1 - f * ln(1 + age))`
    Logarithmic,
}

impl DecayType {
    /// Get the decay type name
    pub fn as_str(&self) -> &'static str {
        match self {
            DecayType::Linear => "linear",
            DecayType::Exponential => "exponential",
            DecayType::Logarithmic => "logarithmic",
        }
    }

    /// Parse a decay type from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Some(DecayType::Linear),
            "exponential" => Some(DecayType::Exponential),
            "logarithmic" => Some(DecayType::Logarithmic),
            _ => None,
        }
    }
}

impl fmt::Display for DecayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DecayType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid decay type: {}", s))
    }
}

/// Global decay settings
///
/// Persisted as `{"decayFactor": f64, "decayType": "linear"|...}`. A factor
/// of zero disables decay entirely.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecaySettings {
    /// Decay rate per day (>= 0)
    #[serde(default)]
    pub decay_factor: f64,

    /// Curve shape
    #[serde(default)]
    pub decay_type: DecayType,
}

impl DecaySettings {
    /// Create settings
    pub fn new(decay_factor: f64, decay_type: DecayType) -> Self {
        Self {
            decay_factor,
            decay_type,
        }
    }

    /// Check the factor is a finite, non-negative number
    pub fn validate(&self) -> Result<(), String> {
        if !self.decay_factor.is_finite() || self.decay_factor < 0.0 {
            return Err(format!(
                "decay factor must be a non-negative number, got {}",
                self.decay_factor
            ));
        }
        Ok(())
    }
}

/// A weighted event as seen by the score computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedEvent {
    /// Weight of the interaction's type
    pub weight: u32,

    /// When it happened (ms since epoch)
    pub timestamp: i64,
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Whether epoch milliseconds fall within the representable calendar range
pub fn is_valid_timestamp(ms: i64) -> bool {
    DateTime::<Utc>::from_timestamp_millis(ms).is_some()
}

/// Age of an event in fractional days
pub fn age_in_days(now_ms: i64, timestamp_ms: i64) -> f64 {
    now_ms.saturating_sub(timestamp_ms) as f64 / MS_PER_DAY
}

/// Decay multiplier for an event of the given age
///
/// Returns exactly 1.0 when the factor is zero or the event is not in the
/// past. Results are always within `[0, 1]`.
pub fn decay_multiplier(age_days: f64, settings: &DecaySettings) -> f64 {
    let factor = settings.decay_factor;
    if factor == 0.0 || age_days <= 0.0 {
        return 1.0;
    }

    match settings.decay_type {
        DecayType::Linear => (1.0 - factor * age_days).max(0.0),
        DecayType::Exponential => (-factor * age_days).exp(),
        DecayType::Logarithmic => (1.0 - factor * (1.0 + age_days).ln()).max(0.0),
    }
}

/// Compute a score from weighted events
///
/// Sum of `weight * multiplier`; no normalization and no upper bound.
pub fn compute_score(events: &[WeightedEvent], now_ms: i64, settings: &DecaySettings) -> f64 {
    events
        .iter()
        .map(|e| {
            let age = age_in_days(now_ms, e.timestamp);
            e.weight as f64 * decay_multiplier(age, settings)
        })
        .sum()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn decay_type() -> impl Strategy<Value = DecayType> {
        prop_oneof![
            Just(DecayType::Linear),
            Just(DecayType::Exponential),
            Just(DecayType::Logarithmic),
        ]
    }

    proptest! {
        /// Property: older interactions never count for more
        #[test]
        fn test_multiplier_non_increasing_in_age(
            factor in 0.0f64..2.0,
            kind in decay_type(),
            age in 0.0f64..1000.0,
            delta in 0.0f64..1000.0,
        ) {
            let settings = DecaySettings::new(factor, kind);
            let younger = decay_multiplier(age, &settings);
            let older = decay_multiplier(age + delta, &settings);
            prop_assert!(older <= younger + 1e-12,
                "multiplier rose from {} to {}", younger, older);
        }

        /// Property: multipliers stay within [0, 1]
        #[test]
        fn test_multiplier_range(
            factor in 0.0f64..5.0,
            kind in decay_type(),
            age in -10.0f64..10000.0,
        ) {
            let m = decay_multiplier(age, &DecaySettings::new(factor, kind));
            prop_assert!((0.0..=1.0).contains(&m));
        }

        /// Property: with no decay the score is the raw weight sum
        #[test]
        fn test_zero_factor_sum(
            weights in proptest::collection::vec(1u32..20, 0..10),
            kind in decay_type(),
        ) {
            let events: Vec<_> = weights
                .iter()
                .enumerate()
                .map(|(i, &w)| WeightedEvent { weight: w, timestamp: 1_000 + i as i64 * 86_400_000 })
                .collect();
            let expected: u32 = weights.iter().sum();
            let score = compute_score(&events, 1_000_000_000_000, &DecaySettings::new(0.0, kind));
            prop_assert_eq!(score, expected as f64);
        }
    }
}
