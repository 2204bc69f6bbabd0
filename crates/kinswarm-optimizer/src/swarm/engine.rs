//! Swarm engine: INITIALIZED → RUNNING → {CONVERGED, MAX_ITER_REACHED, CANCELLED}
//!
//! Each engine owns its particles, RNG stream, and history. The roster and
//! compatibility matrix are borrowed read-only, so any number of engines can
//! run concurrently over the same roster.

use kinswarm_common::{ConfigError, Roster, TaskRequirement};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::budget::{CancelReason, RunBudget};
use super::particle::{decode, Motion, Particle};
use crate::compatibility::CompatibilityMatrix;
use crate::fitness::FitnessEvaluator;
use crate::SwarmConfig;

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Initialized,
    Running,
    Converged,
    MaxIterReached,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunState::Initialized | RunState::Running)
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    MaxIterationsReached,
    /// Global best flat over the plateau window
    Plateau,
    /// Global best above the excellence threshold
    Excellent,
    Cancelled(CancelReason),
}

impl Termination {
    pub fn state(self) -> RunState {
        match self {
            Termination::MaxIterationsReached => RunState::MaxIterReached,
            Termination::Plateau | Termination::Excellent => RunState::Converged,
            Termination::Cancelled(_) => RunState::Cancelled,
        }
    }
}

/// Global-best team after one iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSnapshot {
    /// 1-based iteration number
    pub iteration: usize,
    /// Roster indices, ascending
    pub members: Vec<usize>,
    pub fitness: f64,
}

/// Result of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmOutcome {
    /// Roster indices of the best team found
    pub best_team: Vec<usize>,
    pub best_fitness: f64,
    /// Global-best fitness after each iteration
    pub fitness_history: Vec<f64>,
    pub snapshots: Vec<TeamSnapshot>,
    pub iterations_run: usize,
    /// Iteration at which the run stopped (0 if stopped before the first)
    pub convergence_iteration: usize,
    pub termination: Termination,
    pub seed: u64,
    pub evaluations: u64,
    pub evaluation_failures: u64,
}

/// Fitness calls plus failure accounting
struct Scorer<'a> {
    evaluator: FitnessEvaluator,
    task: &'a TaskRequirement,
    roster: &'a Roster,
    matrix: &'a CompatibilityMatrix,
    evaluations: u64,
    failures: u64,
}

impl Scorer<'_> {
    /// Non-finite results count as failures and score 0
    fn score(&mut self, team: &[usize]) -> f64 {
        self.evaluations += 1;
        let fitness = self.evaluator.evaluate(team, self.task, self.roster, self.matrix);
        if fitness.is_finite() {
            return fitness;
        }
        self.failures += 1;
        warn!(task_id = %self.task.task_id, ?team, fitness, "Non-finite fitness, scoring particle as 0");
        0.0
    }
}

/// Discrete PSO over binary selection vectors
pub struct SwarmEngine<'a> {
    config: &'a SwarmConfig,
    task: &'a TaskRequirement,
    scorer: Scorer<'a>,
    rng: StdRng,
    seed: u64,
    state: RunState,
    particles: Vec<Particle>,
    global_best_position: Vec<bool>,
    global_best_fitness: f64,
    iteration: usize,
    fitness_history: Vec<f64>,
    snapshots: Vec<TeamSnapshot>,
}

impl<'a> SwarmEngine<'a> {
    /// Validate the configuration and task. No particle exists until [`run`](Self::run).
    pub fn new(
        config: &'a SwarmConfig,
        roster: &'a Roster,
        matrix: &'a CompatibilityMatrix,
        task: &'a TaskRequirement,
        evaluator: FitnessEvaluator,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        task.validate(roster.len())?;
        if matrix.len() != roster.len() {
            return Err(ConfigError::MatrixSizeMismatch {
                matrix: matrix.len(),
                roster: roster.len(),
            });
        }

        let seed = config.seed.unwrap_or_else(rand::random);

        Ok(Self {
            config,
            task,
            scorer: Scorer {
                evaluator,
                task,
                roster,
                matrix,
                evaluations: 0,
                failures: 0,
            },
            rng: StdRng::seed_from_u64(seed),
            seed,
            state: RunState::Initialized,
            particles: Vec::new(),
            global_best_position: vec![false; roster.len()],
            global_best_fitness: f64::NEG_INFINITY,
            iteration: 0,
            fitness_history: Vec::new(),
            snapshots: Vec::new(),
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn global_best_fitness(&self) -> f64 {
        self.global_best_fitness
    }

    fn motion(&self) -> Motion {
        Motion {
            inertia: self.config.inertia,
            cognitive: self.config.cognitive,
            social: self.config.social,
            clamp: self.config.velocity_clamp,
        }
    }

    /// Create and evaluate the population, seeding personal and global bests
    fn initialize(&mut self) {
        let n = self.global_best_position.len();
        let (min, max) = self.task.team_size_range();

        self.particles = (0..self.config.particle_count)
            .map(|_| Particle::random(n, min, max, &mut self.rng))
            .collect();

        for particle in &mut self.particles {
            let fitness = self.scorer.score(&particle.team());
            particle.record(fitness);
            if fitness > self.global_best_fitness {
                self.global_best_fitness = fitness;
                self.global_best_position.copy_from_slice(particle.position());
            }
        }

        self.state = RunState::Running;
        debug!(
            task_id = %self.task.task_id,
            particles = self.particles.len(),
            fitness = self.global_best_fitness,
            "Swarm initialized"
        );
    }

    /// One full iteration over every particle
    fn step(&mut self) {
        let (min, max) = self.task.team_size_range();
        let motion = self.motion();

        for particle in &mut self.particles {
            particle.fly(&self.global_best_position, motion, &mut self.rng);
            particle.repair(min, max, &mut self.rng);

            let fitness = self.scorer.score(&particle.team());
            particle.record(fitness);
            if fitness > self.global_best_fitness {
                self.global_best_fitness = fitness;
                self.global_best_position.copy_from_slice(particle.position());
            }
        }

        self.iteration += 1;
        self.fitness_history.push(self.global_best_fitness);
        self.snapshots.push(TeamSnapshot {
            iteration: self.iteration,
            members: decode(&self.global_best_position),
            fitness: self.global_best_fitness,
        });
    }

    /// First match wins: iteration limit, plateau, excellence
    fn check_convergence(&self) -> Option<Termination> {
        if self.iteration >= self.config.max_iterations {
            return Some(Termination::MaxIterationsReached);
        }

        let window = self.config.plateau_window;
        if window > 0 && self.fitness_history.len() >= window {
            let recent = &self.fitness_history[self.fitness_history.len() - window..];
            let hi = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let lo = recent.iter().copied().fold(f64::INFINITY, f64::min);
            if hi - lo < self.config.plateau_tolerance {
                return Some(Termination::Plateau);
            }
        }

        if self.global_best_fitness > self.config.excellence_threshold {
            return Some(Termination::Excellent);
        }

        None
    }

    /// Run to termination, honoring `budget` between iterations.
    ///
    /// A cancelled run still returns the best team found so far.
    pub fn run(mut self, budget: &RunBudget) -> SwarmOutcome {
        info!(
            task_id = %self.task.task_id,
            seed = self.seed,
            particles = self.config.particle_count,
            max_iterations = self.config.max_iterations,
            "Starting team search"
        );
        self.initialize();

        let termination = loop {
            if let Some(reason) = budget.exhausted(self.iteration) {
                break Termination::Cancelled(reason);
            }

            self.step();
            debug!(
                iteration = self.iteration,
                fitness = self.global_best_fitness,
                "Iteration complete"
            );

            if let Some(termination) = self.check_convergence() {
                break termination;
            }
        };

        self.state = termination.state();
        info!(
            task_id = %self.task.task_id,
            iterations = self.iteration,
            fitness = self.global_best_fitness,
            ?termination,
            "Team search finished"
        );

        SwarmOutcome {
            best_team: decode(&self.global_best_position),
            best_fitness: self.global_best_fitness,
            fitness_history: self.fitness_history,
            snapshots: self.snapshots,
            iterations_run: self.iteration,
            convergence_iteration: self.iteration,
            termination,
            seed: self.seed,
            evaluations: self.scorer.evaluations,
            evaluation_failures: self.scorer.failures,
        }
    }
}
