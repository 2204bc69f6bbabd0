//! Discrete particle swarm search
pub mod budget;
pub mod engine;
pub mod particle;

pub use self::budget::{CancelReason, RunBudget};
pub use self::engine::{RunState, SwarmEngine, SwarmOutcome, TeamSnapshot, Termination};
pub use self::particle::Particle;
