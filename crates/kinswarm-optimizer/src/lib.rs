//! # Kinswarm Optimizer
//!
//! Team composition engine: selects a subset of workers that maximizes a
//! multi-objective fitness for a task.
//!
//! ## Fitness Formula
//!
//! ```text
//! η = priority × (0.40·capability + 0.30·cooperation + 0.20·size + 0.10·diversity)
//! ```
//!
//! Where:
//! - capability: share of required capabilities the team covers
//! - cooperation: mean pairwise compatibility (kin-weighted module overlap)
//! - size: 1 inside the size range, decaying linearly outside it
//! - diversity: distinct genotype groups / total groups
//!
//! ## Search
//!
//! Discrete particle swarm over binary selection vectors with sigmoid
//! position updates and uniform size repair. Runs stop on the iteration
//! limit, a 10-iteration fitness plateau, or fitness above 0.95.

pub mod adapter;
pub mod compatibility;
pub mod config;
pub mod fitness;
pub mod optimizer;
pub mod strategy;
pub mod swarm;
pub mod telemetry;

use kinswarm_common::ConfigError;
use serde::{Deserialize, Serialize};

pub use adapter::{load_roster_json, WorkerProfile, WorkerRegistry};
pub use compatibility::CompatibilityMatrix;
pub use self::config::OptimizerConfig;
pub use fitness::{fitness, FitnessBreakdown, FitnessEvaluator, FitnessWeights};
pub use optimizer::{OptimizationReport, RunStatistics, TeamOptimizer, TeamSelection};
pub use strategy::{detect_strategies, EmergentStrategy, StrategyKind};
pub use swarm::{RunBudget, RunState, SwarmEngine, SwarmOutcome, TeamSnapshot, Termination};

/// Compatibility multiplier for same-genotype pairs
pub const DEFAULT_KIN_BONUS: f64 = 1.5;

/// Hard ceiling on `max_iterations`
pub const MAX_ITERATIONS_LIMIT: usize = 1000;

/// Swarm search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Number of particles
    pub particle_count: usize,
    /// Iteration limit, in [1, 1000]
    pub max_iterations: usize,
    /// Inertia weight w
    pub inertia: f64,
    /// Cognitive coefficient c1
    pub cognitive: f64,
    /// Social coefficient c2
    pub social: f64,
    /// Velocity components are clamped to ±this
    pub velocity_clamp: f64,
    /// RNG seed; drawn from entropy when absent
    pub seed: Option<u64>,
    /// Number of trailing global-best values checked for a plateau
    pub plateau_window: usize,
    /// Plateau when max - min of the window is below this
    pub plateau_tolerance: f64,
    /// Stop once global-best fitness exceeds this
    pub excellence_threshold: f64,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            particle_count: 25,
            max_iterations: 75,
            inertia: 0.7,
            cognitive: 1.5,
            social: 1.5,
            velocity_clamp: 4.0,
            seed: None,
            plateau_window: 10,
            plateau_tolerance: 0.001,
            excellence_threshold: 0.95,
        }
    }
}

impl SwarmConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_particle_count(mut self, particle_count: usize) -> Self {
        self.particle_count = particle_count;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_ITERATIONS_LIMIT).contains(&self.max_iterations) {
            return Err(ConfigError::MaxIterationsOutOfRange {
                value: self.max_iterations,
                limit: MAX_ITERATIONS_LIMIT,
            });
        }
        if self.particle_count == 0 {
            return Err(ConfigError::InvalidParticleCount {
                value: self.particle_count,
            });
        }
        let coefficients = [
            ("inertia", self.inertia),
            ("cognitive", self.cognitive),
            ("social", self.social),
            ("velocity_clamp", self.velocity_clamp),
            ("plateau_tolerance", self.plateau_tolerance),
            ("excellence_threshold", self.excellence_threshold),
        ];
        for (name, value) in coefficients {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidCoefficient { name, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SwarmConfig::default().validate().is_ok());
    }

    #[test]
    fn test_max_iterations_bounds() {
        let low = SwarmConfig::default().with_max_iterations(0);
        let high = SwarmConfig::default().with_max_iterations(1001);
        assert!(matches!(
            low.validate(),
            Err(ConfigError::MaxIterationsOutOfRange { value: 0, .. })
        ));
        assert!(matches!(
            high.validate(),
            Err(ConfigError::MaxIterationsOutOfRange { value: 1001, .. })
        ));
        assert!(SwarmConfig::default().with_max_iterations(1000).validate().is_ok());
    }

    #[test]
    fn test_nan_coefficient_rejected() {
        let config = SwarmConfig {
            inertia: f64::NAN,
            ..SwarmConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCoefficient { name: "inertia", .. })
        ));
    }

    #[test]
    fn test_excellence_threshold_must_be_finite() {
        for value in [f64::NAN, f64::INFINITY, -0.5] {
            let config = SwarmConfig {
                excellence_threshold: value,
                ..SwarmConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidCoefficient { name: "excellence_threshold", .. })
            ));
        }
    }
}
