//! Worker and Roster
//!
//! A [`Worker`] is a selectable unit with capabilities. A [`Roster`] is the
//! fixed, ordered set of workers an optimization runs over; a worker's
//! position in the roster is its dimension in every selection vector.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::genotype::GenotypeGroup;
use crate::error::ConfigError;

/// Fitness estimate assigned to workers without an observed value
pub const DEFAULT_FITNESS: f64 = 0.5;

/// A selectable worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    /// Unique name within a roster
    pub name: String,
    /// Role label (informational)
    pub role: String,
    /// Cooperation category
    pub genotype: GenotypeGroup,
    /// Capabilities matched against task requirements
    pub capabilities: BTreeSet<String>,
    /// Modules, used only for compatibility
    pub modules: BTreeSet<String>,
    /// Externally supplied success estimate in [0, 1]
    pub fitness: f64,
}

impl Worker {
    pub fn new(name: impl Into<String>, role: impl Into<String>, genotype: GenotypeGroup) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            genotype,
            capabilities: BTreeSet::new(),
            modules: BTreeSet::new(),
            fitness: DEFAULT_FITNESS,
        }
    }

    /// Set capabilities
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Set modules
    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules = modules.into_iter().map(Into::into).collect();
        self
    }

    /// Set fitness estimate (clamped to [0, 1], NaN falls back to the default)
    pub fn with_fitness(mut self, fitness: f64) -> Self {
        self.fitness = bounded_fitness(fitness);
        self
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

/// Immutable, ordered worker pool
#[derive(Debug, Clone)]
pub struct Roster {
    workers: Vec<Worker>,
    by_name: HashMap<String, usize>,
}

impl Roster {
    /// Build a roster. Names must be unique and the roster non-empty.
    pub fn new(workers: Vec<Worker>) -> Result<Self, ConfigError> {
        if workers.is_empty() {
            return Err(ConfigError::EmptyRoster);
        }

        let mut by_name = HashMap::with_capacity(workers.len());
        for (index, worker) in workers.iter().enumerate() {
            if by_name.insert(worker.name.clone(), index).is_some() {
                return Err(ConfigError::DuplicateWorker {
                    name: worker.name.clone(),
                });
            }
        }

        Ok(Self { workers, by_name })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Worker> {
        self.workers.get(index)
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Worker> {
        self.workers.iter()
    }

    /// Copy of this roster with one worker's fitness replaced
    pub fn with_fitness_at(&self, index: usize, fitness: f64) -> Self {
        let mut next = self.clone();
        if let Some(worker) = next.workers.get_mut(index) {
            worker.fitness = bounded_fitness(fitness);
        }
        next
    }

    /// Resolve indices to workers, skipping anything out of range
    pub fn select<'a>(&'a self, indices: &'a [usize]) -> impl Iterator<Item = &'a Worker> + 'a {
        indices.iter().filter_map(move |&i| self.workers.get(i))
    }
}

impl std::ops::Index<usize> for Roster {
    type Output = Worker;

    fn index(&self, index: usize) -> &Self::Output {
        &self.workers[index]
    }
}

fn bounded_fitness(fitness: f64) -> f64 {
    if fitness.is_nan() {
        DEFAULT_FITNESS
    } else {
        fitness.clamp(0.0, 1.0)
    }
}
