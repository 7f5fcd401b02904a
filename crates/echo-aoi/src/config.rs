// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Manager configuration, stored as a JSON blob.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::Interest;

/// Error type for config decoding and encoding.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// A value decoded fine but is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for an [`AoiManager`](crate::AoiManager).
///
/// Missing fields fall back to [`AoiConfig::default`].
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AoiConfig {
    /// Radius given to entities that enter without a positive radius.
    pub default_radius: f32,
    /// Pre-allocated entity slots per axis.
    pub initial_capacity: usize,
    /// Capabilities given to entities built through [`AoiConfig::entity`].
    pub default_interest: Interest,
}

impl Default for AoiConfig {
    fn default() -> Self {
        Self {
            default_radius: 10.0,
            initial_capacity: 256,
            default_interest: Interest::ALL,
        }
    }
}

impl AoiConfig {
    /// Decodes and validates a JSON config blob. Empty input yields the defaults.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Encodes this config as pretty-printed JSON.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, ConfigError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Rejects non-finite or non-positive default radii.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_radius.is_finite() || self.default_radius <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "default_radius must be finite and positive, got {}",
                self.default_radius
            )));
        }
        Ok(())
    }

    /// Builds an entity carrying this config's default radius and interest.
    pub fn entity<T>(&self, payload: T) -> crate::Entity<T> {
        crate::Entity::new(payload)
            .with_radius(self.default_radius)
            .with_interest(self.default_interest)
    }
}
