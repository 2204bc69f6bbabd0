//! TaskRequirement - what a team must cover

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maximum number of required capabilities per task
pub const MAX_REQUIRED_CAPABILITIES: usize = 100;

/// Default priority multiplier
pub const DEFAULT_PRIORITY: f64 = 1.0;

fn default_priority() -> f64 {
    DEFAULT_PRIORITY
}

/// Capabilities and team-size bounds a selected team must satisfy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequirement {
    pub task_id: String,
    pub required_capabilities: BTreeSet<String>,
    /// Inclusive lower bound on team size
    pub min_team_size: usize,
    /// Inclusive upper bound on team size
    pub max_team_size: usize,
    /// Fitness multiplier (≥ 0)
    #[serde(default = "default_priority")]
    pub priority: f64,
}

impl TaskRequirement {
    pub fn new<I, S>(task_id: impl Into<String>, required: I, team_size_range: (usize, usize)) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            task_id: task_id.into(),
            required_capabilities: required.into_iter().map(Into::into).collect(),
            min_team_size: team_size_range.0,
            max_team_size: team_size_range.1,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    /// `(min, max)` team size
    pub fn team_size_range(&self) -> (usize, usize) {
        (self.min_team_size, self.max_team_size)
    }

    #[inline]
    pub fn accepts_size(&self, size: usize) -> bool {
        (self.min_team_size..=self.max_team_size).contains(&size)
    }

    /// Validate against a roster of `available` workers.
    ///
    /// Checked in order: `min ≥ 1`, `max ≥ min`, `max ≤ available`,
    /// capability count, priority.
    pub fn validate(&self, available: usize) -> Result<(), ConfigError> {
        if self.min_team_size < 1 {
            return Err(ConfigError::MinTeamSizeTooSmall {
                min: self.min_team_size,
            });
        }
        if self.max_team_size < self.min_team_size {
            return Err(ConfigError::MaxBelowMin {
                min: self.min_team_size,
                max: self.max_team_size,
            });
        }
        if self.max_team_size > available {
            return Err(ConfigError::MaxExceedsAvailable {
                max: self.max_team_size,
                available,
            });
        }
        if self.required_capabilities.len() > MAX_REQUIRED_CAPABILITIES {
            return Err(ConfigError::TooManyRequiredCapabilities {
                count: self.required_capabilities.len(),
                limit: MAX_REQUIRED_CAPABILITIES,
            });
        }
        if !self.priority.is_finite() || self.priority < 0.0 {
            return Err(ConfigError::InvalidPriority {
                value: self.priority,
            });
        }
        Ok(())
    }
}
