//! Emergent strategy detection
pub mod detector;

pub use self::detector::{describe_strategies, detect_strategies, EmergentStrategy, StrategyKind};
