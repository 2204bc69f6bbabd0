//! Team fitness: η = priority × (0.40·capability + 0.30·cooperation + 0.20·size + 0.10·diversity)

use std::collections::BTreeSet;

use kinswarm_common::{GenotypeGroup, GenotypeSet, Roster, TaskRequirement};
use serde::{Deserialize, Serialize};

use crate::compatibility::CompatibilityMatrix;

/// Component weights and the kin bonus used by the compatibility model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessWeights {
    pub capability: f64,
    pub cooperation: f64,
    pub size: f64,
    pub diversity: f64,
    /// Multiplier on module overlap for same-genotype pairs
    pub kin_bonus: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            capability: 0.40,
            cooperation: 0.30,
            size: 0.20,
            diversity: 0.10,
            kin_bonus: crate::DEFAULT_KIN_BONUS,
        }
    }
}

/// Per-component scores of one team
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessBreakdown {
    pub capability: f64,
    pub cooperation: f64,
    pub size: f64,
    pub diversity: f64,
    /// Weighted sum times priority
    pub total: f64,
}

impl FitnessBreakdown {
    const EMPTY: FitnessBreakdown = FitnessBreakdown {
        capability: 0.0,
        cooperation: 0.0,
        size: 0.0,
        diversity: 0.0,
        total: 0.0,
    };
}

/// Pure team scorer. Never mutates the roster or the matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitnessEvaluator {
    weights: FitnessWeights,
}

impl FitnessEvaluator {
    pub fn new(weights: FitnessWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &FitnessWeights {
        &self.weights
    }

    /// Fitness of `team` (roster indices) for `task`
    #[inline]
    pub fn evaluate(
        &self,
        team: &[usize],
        task: &TaskRequirement,
        roster: &Roster,
        matrix: &CompatibilityMatrix,
    ) -> f64 {
        self.breakdown(team, task, roster, matrix).total
    }

    /// Component scores; an empty team scores 0 everywhere
    pub fn breakdown(
        &self,
        team: &[usize],
        task: &TaskRequirement,
        roster: &Roster,
        matrix: &CompatibilityMatrix,
    ) -> FitnessBreakdown {
        if team.is_empty() {
            return FitnessBreakdown::EMPTY;
        }

        let capability = capability_score(team, task, roster);
        let cooperation = matrix.mean_pairwise(team).unwrap_or(1.0);
        let size = size_score(team.len(), task);
        let diversity = diversity_score(team, roster);

        let w = &self.weights;
        let weighted = w.capability * capability
            + w.cooperation * cooperation
            + w.size * size
            + w.diversity * diversity;

        FitnessBreakdown {
            capability,
            cooperation,
            size,
            diversity,
            total: weighted * task.priority,
        }
    }
}

/// Fitness with default weights
pub fn fitness(
    team: &[usize],
    task: &TaskRequirement,
    roster: &Roster,
    matrix: &CompatibilityMatrix,
) -> f64 {
    FitnessEvaluator::default().evaluate(team, task, roster, matrix)
}

/// Share of required capabilities covered by the team's union
pub(crate) fn capability_score(team: &[usize], task: &TaskRequirement, roster: &Roster) -> f64 {
    if task.required_capabilities.is_empty() {
        return 1.0;
    }
    let covered: BTreeSet<&str> = roster
        .select(team)
        .flat_map(|w| w.capabilities.iter().map(String::as_str))
        .filter(|c| task.required_capabilities.contains(*c))
        .collect();
    covered.len() as f64 / task.required_capabilities.len() as f64
}

pub(crate) fn size_score(size: usize, task: &TaskRequirement) -> f64 {
    let (min, max) = task.team_size_range();
    if size < min {
        size as f64 / min as f64
    } else if size > max {
        (1.0 - (size - max) as f64 / max as f64).max(0.0)
    } else {
        1.0
    }
}

pub(crate) fn diversity_score(team: &[usize], roster: &Roster) -> f64 {
    let groups: GenotypeSet = roster.select(team).map(|w| w.genotype).collect();
    groups.len() as f64 / GenotypeGroup::COUNT as f64
}
