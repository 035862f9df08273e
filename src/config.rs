//! Configuration for stabilization passes and material sources.
//!
//! Both structs deserialize with per-field defaults, so a partial document
//! (or an empty one) is a valid configuration.

use crate::error::ConfigurationError;
use crate::query::MatchTier;
use crate::rules::LEGAL_ROW_SETS;
use serde::{Deserialize, Serialize};

/// Bounds and seeding of a stabilization pass.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StabilizerConfig {
    /// Deepest allowed nesting of resolutions.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Most work items one pass may process.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Seed for connection and candidate choices; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

// ============================================================================
// Serde Default Functions for StabilizerConfig
// ============================================================================

fn default_max_depth() -> usize {
    LEGAL_ROW_SETS.len()
}

fn default_max_steps() -> usize {
    1024
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self { max_depth: default_max_depth(), max_steps: default_max_steps(), seed: None }
    }
}

impl StabilizerConfig {
    /// Default bounds with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed), ..Self::default() }
    }

    /// Checks that both bounds are positive.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_depth == 0 {
            return Err(ConfigurationError::InvalidConfig("max_depth must be at least 1".into()));
        }
        if self.max_steps == 0 {
            return Err(ConfigurationError::InvalidConfig("max_steps must be at least 1".into()));
        }
        Ok(())
    }
}

/// Candidate selection policy of an in-memory source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Tiers tried in order; the first with any match answers.
    #[serde(default = "default_ladder")]
    pub ladder: Vec<MatchTier>,
}

fn default_ladder() -> Vec<MatchTier> {
    MatchTier::LADDER.to_vec()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { ladder: default_ladder() }
    }
}

impl SourceConfig {
    /// Checks that the ladder is non-empty and has no repeated tier.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.ladder.is_empty() {
            return Err(ConfigurationError::InvalidConfig("ladder must not be empty".into()));
        }
        for (i, tier) in self.ladder.iter().enumerate() {
            if self.ladder[..i].contains(tier) {
                return Err(ConfigurationError::InvalidConfig(format!("tier {tier} appears twice")));
            }
        }
        Ok(())
    }
}
