//! TeamOptimizer - roster registration and per-task team search
//!
//! The compatibility matrix is built once when a roster is registered and
//! shared read-only by every `optimize_team` call. Each call owns its own
//! swarm, RNG stream, and history.

use std::collections::BTreeMap;
use std::sync::Arc;

use kinswarm_common::{KinswarmError, Result, Roster, TaskRequirement};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::compatibility::CompatibilityMatrix;
use crate::config::OptimizerConfig;
use crate::fitness::{FitnessBreakdown, FitnessEvaluator};
use crate::strategy::describe_strategies;
use crate::swarm::{RunBudget, SwarmEngine, SwarmOutcome, TeamSnapshot, Termination};
use crate::telemetry::OptimizerMetrics;

/// The selected team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSelection {
    /// Worker names, in roster order
    pub selected_workers: Vec<String>,
    pub fitness: f64,
    /// Why each worker is on the team
    pub explanations: BTreeMap<String, String>,
}

/// Run statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub iterations_run: usize,
    pub final_fitness: f64,
    pub convergence_iteration: usize,
    pub termination: Termination,
    pub fitness_history: Vec<f64>,
    pub seed: u64,
    pub evaluations: u64,
    pub evaluation_failures: u64,
}

/// Everything one `optimize_team` call produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub task_id: String,
    pub selection: TeamSelection,
    pub statistics: RunStatistics,
    pub breakdown: FitnessBreakdown,
    /// Patterns among the best teams of the run
    pub strategies: Vec<String>,
    pub snapshots: Vec<TeamSnapshot>,
}

pub struct TeamOptimizer {
    roster: Arc<Roster>,
    matrix: Arc<CompatibilityMatrix>,
    config: OptimizerConfig,
    evaluator: FitnessEvaluator,
    metrics: Option<Arc<OptimizerMetrics>>,
}

impl TeamOptimizer {
    /// Register a roster and build its compatibility matrix
    pub fn new(roster: Arc<Roster>, config: OptimizerConfig) -> Result<Self> {
        config.validate()?;
        let matrix = Arc::new(CompatibilityMatrix::build_with_kin_bonus(
            &roster,
            config.weights.kin_bonus,
        ));
        Self::with_matrix(roster, matrix, config)
    }

    /// Reuse a matrix already built for `roster`
    pub fn with_matrix(
        roster: Arc<Roster>,
        matrix: Arc<CompatibilityMatrix>,
        config: OptimizerConfig,
    ) -> Result<Self> {
        config.validate()?;
        if matrix.len() != roster.len() {
            return Err(kinswarm_common::ConfigError::MatrixSizeMismatch {
                matrix: matrix.len(),
                roster: roster.len(),
            }
            .into());
        }
        Ok(Self {
            roster,
            matrix,
            evaluator: FitnessEvaluator::new(config.weights),
            config,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<OptimizerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn roster(&self) -> &Arc<Roster> {
        &self.roster
    }

    pub fn matrix(&self) -> &Arc<CompatibilityMatrix> {
        &self.matrix
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Search with the configured seed and no caller budget
    pub fn optimize_team(&self, task: &TaskRequirement) -> Result<OptimizationReport> {
        self.optimize_team_with(task, self.config.swarm.seed, &RunBudget::unlimited())
    }

    /// Search with an explicit seed and budget
    #[instrument(skip(self, task, budget), fields(task_id = %task.task_id))]
    pub fn optimize_team_with(
        &self,
        task: &TaskRequirement,
        seed: Option<u64>,
        budget: &RunBudget,
    ) -> Result<OptimizationReport> {
        let mut swarm = self.config.swarm.clone();
        swarm.seed = seed;

        let engine = SwarmEngine::new(&swarm, &self.roster, &self.matrix, task, self.evaluator)
            .map_err(KinswarmError::from)?;
        let outcome = engine.run(budget);

        if let Some(metrics) = &self.metrics {
            metrics.observe(&outcome);
        }

        Ok(self.report(task, outcome))
    }

    fn report(&self, task: &TaskRequirement, outcome: SwarmOutcome) -> OptimizationReport {
        let breakdown = self
            .evaluator
            .breakdown(&outcome.best_team, task, &self.roster, &self.matrix);
        let strategies = describe_strategies(&outcome.snapshots, &self.roster);

        let selection = TeamSelection {
            selected_workers: self
                .roster
                .select(&outcome.best_team)
                .map(|w| w.name.clone())
                .collect(),
            fitness: outcome.best_fitness,
            explanations: self.explain(&outcome.best_team, task),
        };

        OptimizationReport {
            task_id: task.task_id.clone(),
            selection,
            statistics: RunStatistics {
                iterations_run: outcome.iterations_run,
                final_fitness: outcome.best_fitness,
                convergence_iteration: outcome.convergence_iteration,
                termination: outcome.termination,
                fitness_history: outcome.fitness_history,
                seed: outcome.seed,
                evaluations: outcome.evaluations,
                evaluation_failures: outcome.evaluation_failures,
            },
            breakdown,
            strategies,
            snapshots: outcome.snapshots,
        }
    }

    /// One line per member: role, genotype, covered requirements, fit with teammates
    pub fn explain(&self, team: &[usize], task: &TaskRequirement) -> BTreeMap<String, String> {
        team.iter()
            .filter_map(|&i| self.roster.get(i).map(|w| (i, w)))
            .map(|(i, worker)| {
                let covered: Vec<&str> = worker
                    .capabilities
                    .iter()
                    .filter(|c| task.required_capabilities.contains(*c))
                    .map(String::as_str)
                    .collect();
                let coverage = if covered.is_empty() {
                    "covers no required capabilities".to_string()
                } else {
                    format!("covers {}", covered.join(", "))
                };
                let fit = match self.matrix.mean_with(i, team) {
                    Some(mean) => format!("mean compatibility {:.2} with teammates", mean),
                    None => "works alone".to_string(),
                };
                let text = format!("{} ({}); {}; {}", worker.role, worker.genotype, coverage, fit);
                (worker.name.clone(), text)
            })
            .collect()
    }
}
