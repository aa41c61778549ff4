//! Fleet policy configuration.
//!
//! # Responsibility
//! - Hold tunable fleet rules (operator capacity, feed sizes, validation floors).
//! - Deserialize partial config documents with per-field defaults.
//!
//! # Invariants
//! - A validated config has non-zero capacity and feed limits.
//! - `feed_default_limit <= feed_limit_max`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_MAX_OPERATORS_PER_VEHICLE: u32 = 3;
pub const DEFAULT_MATERIAL_THRESHOLD: u32 = 5;
pub const DEFAULT_DEFECT_MIN_CHARS: usize = 10;
pub const DEFAULT_VEHICLE_ACTIVITY_LIMIT: u32 = 5;
pub const DEFAULT_FEED_LIMIT: u32 = 15;
pub const DEFAULT_FEED_LIMIT_MAX: u32 = 100;
pub const DEFAULT_LOGIN_ATTEMPTS_BEFORE_RESET_HINT: u32 = 3;

/// Fleet-wide business rules shared by all services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FleetConfig {
    pub max_operators_per_vehicle: u32,
    /// Threshold applied when a material is stocked without one.
    pub default_material_threshold: u32,
    /// Minimum trimmed length of a defect description.
    pub defect_min_chars: usize,
    pub vehicle_activity_limit: u32,
    pub feed_default_limit: u32,
    pub feed_limit_max: u32,
    pub login_attempts_before_reset_hint: u32,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            max_operators_per_vehicle: DEFAULT_MAX_OPERATORS_PER_VEHICLE,
            default_material_threshold: DEFAULT_MATERIAL_THRESHOLD,
            defect_min_chars: DEFAULT_DEFECT_MIN_CHARS,
            vehicle_activity_limit: DEFAULT_VEHICLE_ACTIVITY_LIMIT,
            feed_default_limit: DEFAULT_FEED_LIMIT,
            feed_limit_max: DEFAULT_FEED_LIMIT_MAX,
            login_attempts_before_reset_hint: DEFAULT_LOGIN_ATTEMPTS_BEFORE_RESET_HINT,
        }
    }
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroValue(&'static str),
    FeedLimitAboveMax { default_limit: u32, max: u32 },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroValue(field) => write!(f, "config field `{field}` must be greater than 0"),
            Self::FeedLimitAboveMax { default_limit, max } => write!(
                f,
                "feed_default_limit {default_limit} exceeds feed_limit_max {max}"
            ),
        }
    }
}

impl Error for ConfigError {}

impl FleetConfig {
    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_zero = [
            ("max_operators_per_vehicle", self.max_operators_per_vehicle),
            ("vehicle_activity_limit", self.vehicle_activity_limit),
            ("feed_default_limit", self.feed_default_limit),
            ("feed_limit_max", self.feed_limit_max),
        ];
        for (field, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::ZeroValue(field));
            }
        }
        if self.feed_default_limit > self.feed_limit_max {
            return Err(ConfigError::FeedLimitAboveMax {
                default_limit: self.feed_default_limit,
                max: self.feed_limit_max,
            });
        }
        Ok(())
    }

    /// Applies the feed default/clamp rule to a caller-provided limit.
    pub fn normalize_feed_limit(&self, limit: Option<u32>) -> u32 {
        match limit {
            None | Some(0) => self.feed_default_limit,
            Some(value) => value.min(self.feed_limit_max),
        }
    }
}
