// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Derivation settings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{CATEGORY_BASIC, CATEGORY_CENSORING, DEFAULT_MAX_EPOCHS};

/// Error type for config parsing and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Parsed settings are unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for [`factorized_joint_logprob`](crate::factorized_joint_logprob)
/// and [`joint_logprob`](crate::joint_logprob).
///
/// Missing JSON fields take their defaults; unknown fields are rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogprobConfig {
    /// Rewrite categories to run; a rule runs when any of its tags is listed.
    pub categories: Vec<String>,
    /// Sum each term to a scalar before adding terms together.
    pub sum: bool,
    /// Epoch budget for reaching a rewrite fixed point.
    pub max_epochs: usize,
    /// Guard round-family densities so off-grid values fail evaluation
    /// instead of being snapped.
    pub validate_round_grid: bool,
}

impl Default for LogprobConfig {
    fn default() -> Self {
        Self {
            categories: vec![CATEGORY_BASIC.to_owned(), CATEGORY_CENSORING.to_owned()],
            sum: true,
            max_epochs: DEFAULT_MAX_EPOCHS,
            validate_round_grid: false,
        }
    }
}

impl LogprobConfig {
    /// Parses and validates settings from JSON.
    ///
    /// # Errors
    /// Returns [`ConfigError::Serde`] for malformed JSON or unknown fields and
    /// [`ConfigError::Invalid`] for a zero epoch budget.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants serde cannot express.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] when `max_epochs` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_epochs == 0 {
            return Err(ConfigError::Invalid("max_epochs must be at least 1".to_owned()));
        }
        Ok(())
    }

    /// Default settings with per-element terms (`sum = false`).
    #[must_use]
    pub fn elementwise() -> Self {
        Self {
            sum: false,
            ..Self::default()
        }
    }

    /// Replaces the enabled rewrite categories.
    #[must_use]
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }
}
