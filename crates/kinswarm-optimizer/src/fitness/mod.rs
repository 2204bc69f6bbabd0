//! Fitness evaluation module
pub mod calculator;

pub use self::calculator::{fitness, FitnessBreakdown, FitnessEvaluator, FitnessWeights};
