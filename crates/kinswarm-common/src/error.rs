//! Error types for Kinswarm
//!
//! Provides a unified error type and domain-specific error variants

use thiserror::Error;

/// Result type alias using KinswarmError
pub type Result<T> = std::result::Result<T, KinswarmError>;

/// Unified error type for Kinswarm operations
#[derive(Debug, Error)]
pub enum KinswarmError {
    // Construction-time validation errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // Worker profile translation errors
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    // Audit pipeline errors
    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Fatal validation errors raised before any particle exists
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("max_iterations must be in [1, {limit}], got {value}")]
    MaxIterationsOutOfRange { value: usize, limit: usize },

    #[error("team_size_range min must be at least 1, got {min}")]
    MinTeamSizeTooSmall { min: usize },

    #[error("team_size_range max is below min: max={max} < min={min}")]
    MaxBelowMin { min: usize, max: usize },

    #[error("team_size_range max exceeds available workers: max={max} > available={available}")]
    MaxExceedsAvailable { max: usize, available: usize },

    #[error("required_capabilities has {count} entries (limit: {limit})")]
    TooManyRequiredCapabilities { count: usize, limit: usize },

    #[error("particle_count must be at least 1, got {value}")]
    InvalidParticleCount { value: usize },

    #[error("{name} must be a finite, non-negative number, got {value}")]
    InvalidCoefficient { name: &'static str, value: f64 },

    #[error("priority must be a finite, non-negative number, got {value}")]
    InvalidPriority { value: f64 },

    #[error("roster is empty")]
    EmptyRoster,

    #[error("duplicate worker name in roster: {name}")]
    DuplicateWorker { name: String },

    #[error("compatibility matrix is {matrix}x{matrix} but roster has {roster} workers")]
    MatrixSizeMismatch { matrix: usize, roster: usize },
}

/// Errors translating external worker profiles
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    #[error("worker profile has a blank name")]
    BlankName,

    #[error("unknown genotype tag '{tag}' for worker {worker}")]
    UnknownGenotype { worker: String, tag: String },

    #[error("fitness for worker {worker} must be in [0, 1], got {value}")]
    FitnessOutOfRange { worker: String, value: f64 },

    #[error("worker not registered: {0}")]
    UnknownWorker(String),
}

/// Audit log and sink errors
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit sink write failed: {0}")]
    SinkWrite(String),

    #[error("audit entry serialization failed: {0}")]
    Serialization(String),

    #[error("hash mismatch at sequence {sequence}: expected {expected}, got {actual}")]
    HashMismatch {
        sequence: u64,
        expected: String,
        actual: String,
    },

    #[error("broken chain at sequence {sequence}")]
    BrokenChain { sequence: u64 },
}

impl From<serde_json::Error> for KinswarmError {
    fn from(err: serde_json::Error) -> Self {
        KinswarmError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AuditError {
    fn from(err: std::io::Error) -> Self {
        AuditError::SinkWrite(err.to_string())
    }
}
