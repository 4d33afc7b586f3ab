// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Matcher tuning knobs.
use crate::error::MatchError;

/// Default grid spacing for geometric comparisons.
pub const DEFAULT_GEOMETRIC_TOLERANCE: f64 = 1e-5;

/// Configuration for a [`crate::Matcher`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MatcherConfig {
    /// Grid spacing for distance and offset comparisons.
    pub geometric_tolerance: f64,
    /// An update task is emitted only when `|new - old|` exceeds this value.
    pub rate_tolerance: f64,
    /// Check that pattern and neighborhood offsets agree position by position
    /// while matching.
    pub validate_geometry: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            geometric_tolerance: DEFAULT_GEOMETRIC_TOLERANCE,
            rate_tolerance: 0.0,
            validate_geometry: true,
        }
    }
}

impl MatcherConfig {
    /// Checks that both tolerances are finite and non-negative.
    ///
    /// # Errors
    /// Returns [`MatchError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<(), MatchError> {
        for (name, value) in [
            ("geometric_tolerance", self.geometric_tolerance),
            ("rate_tolerance", self.rate_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(MatchError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}
