//! WorkerProfile - external worker record
//!
//! Upstream systems describe workers loosely: the genotype arrives as a
//! free-form tag, module lists go by several names, and records carry
//! fields this crate does not interpret. Unknown fields are kept in
//! `metadata` and never inspected.

use std::collections::BTreeMap;
use std::path::Path;

use kinswarm_common::{
    AdapterError, GenotypeGroup, KinswarmError, Result, Roster, Worker, DEFAULT_FITNESS,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

fn default_role() -> String {
    "worker".to_string()
}

/// External worker record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub name: String,
    #[serde(default = "default_role")]
    pub role: String,
    /// Genotype tag, matched case-insensitively
    #[serde(alias = "genotype_tag", alias = "genotype_group")]
    pub genotype: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default, alias = "module_set")]
    pub modules: Vec<String>,
    /// Success estimate; defaults to 0.5 when absent
    #[serde(default, alias = "success_rate", alias = "initial_fitness")]
    pub fitness: Option<f64>,
    #[serde(flatten)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl TryFrom<WorkerProfile> for Worker {
    type Error = AdapterError;

    fn try_from(profile: WorkerProfile) -> std::result::Result<Self, Self::Error> {
        let name = profile.name.trim().to_string();
        if name.is_empty() {
            return Err(AdapterError::BlankName);
        }

        let genotype: GenotypeGroup =
            profile
                .genotype
                .parse()
                .map_err(|_| AdapterError::UnknownGenotype {
                    worker: name.clone(),
                    tag: profile.genotype.clone(),
                })?;

        let fitness = profile.fitness.unwrap_or(DEFAULT_FITNESS);
        if !(0.0..=1.0).contains(&fitness) {
            return Err(AdapterError::FitnessOutOfRange {
                worker: name,
                value: fitness,
            });
        }

        Ok(Worker::new(name, profile.role, genotype)
            .with_capabilities(profile.capabilities)
            .with_modules(profile.modules)
            .with_fitness(fitness))
    }
}

impl From<&Worker> for WorkerProfile {
    fn from(worker: &Worker) -> Self {
        Self {
            name: worker.name.clone(),
            role: worker.role.clone(),
            genotype: worker.genotype.to_string(),
            capabilities: worker.capabilities.iter().cloned().collect(),
            modules: worker.modules.iter().cloned().collect(),
            fitness: Some(worker.fitness),
            metadata: BTreeMap::new(),
        }
    }
}

/// Convert profiles, failing on the first bad record
pub fn workers_from_profiles(profiles: Vec<WorkerProfile>) -> Result<Vec<Worker>> {
    profiles
        .into_iter()
        .map(|p| Worker::try_from(p).map_err(KinswarmError::from))
        .collect()
}

/// Parse a JSON array of profiles into a roster
pub fn parse_roster_json(json: &str) -> Result<Roster> {
    let profiles: Vec<WorkerProfile> = serde_json::from_str(json)?;
    let workers = workers_from_profiles(profiles)?;
    let roster = Roster::new(workers)?;
    debug!(workers = roster.len(), "Parsed roster");
    Ok(roster)
}

/// Load a roster from a JSON file
pub fn load_roster_json(path: impl AsRef<Path>) -> Result<Roster> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        KinswarmError::Internal(format!("failed to read roster {}: {}", path.display(), e))
    })?;
    parse_roster_json(&content)
}
