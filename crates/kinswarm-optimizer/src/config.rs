//! Optimizer configuration

use std::path::Path;

use anyhow::Result;
use kinswarm_common::ConfigError;
use serde::{Deserialize, Serialize};

use crate::fitness::FitnessWeights;
use crate::SwarmConfig;

/// Environment variable prefix, e.g. `KINSWARM__SWARM__PARTICLE_COUNT=40`
pub const ENV_PREFIX: &str = "KINSWARM";

/// Optimizer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Search parameters
    pub swarm: SwarmConfig,
    /// Fitness weights and kin bonus
    pub weights: FitnessWeights,
}

impl OptimizerConfig {
    /// Load configuration from `.env`, an optional file, and the environment.
    ///
    /// Later sources win: defaults < file < `KINSWARM__*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: OptimizerConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.swarm.validate()?;
        let w = &self.weights;
        let weights = [
            ("capability_weight", w.capability),
            ("cooperation_weight", w.cooperation),
            ("size_weight", w.size),
            ("diversity_weight", w.diversity),
            ("kin_bonus", w.kin_bonus),
        ];
        for (name, value) in weights {
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
    fn test_defaults() {
        let cfg = OptimizerConfig::default();
        assert_eq!(cfg.swarm.particle_count, 25);
        assert_eq!(cfg.weights.capability, 0.40);
        assert_eq!(cfg.weights.kin_bonus, 1.5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kinswarm.toml");
        std::fs::write(
            &path,
            "[swarm]\nparticle_count = 40\nseed = 7\n\n[weights]\nkin_bonus = 1.2\n",
        )
        .unwrap();

        let cfg = OptimizerConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.swarm.particle_count, 40);
        assert_eq!(cfg.swarm.seed, Some(7));
        assert_eq!(cfg.swarm.max_iterations, 75);
        assert_eq!(cfg.weights.kin_bonus, 1.2);
        assert_eq!(cfg.weights.capability, 0.40);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kinswarm.toml");
        std::fs::write(&path, "[swarm]\nmax_iterations = 5000\n").unwrap();
        assert!(OptimizerConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut cfg = OptimizerConfig::default();
        cfg.weights.diversity = -0.1;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidCoefficient { name: "diversity_weight", .. })
        ));
    }
}
