//! # Kinswarm Common
//!
//! Shared types, errors, and the fitness audit log for Kinswarm team
//! composition.
//!
//! ## Core Types
//!
//! - [`Worker`]: selectable unit with capabilities, modules, and a genotype
//! - [`GenotypeGroup`]: closed set of cooperation categories
//! - [`Roster`]: fixed, ordered worker pool a run optimizes over
//! - [`TaskRequirement`]: required capabilities and team-size bounds
//!
//! ## Security
//!
//! - [`security::audit`]: append-only, hash-chained log of fitness changes

pub mod error;
pub mod security;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{AdapterError, AuditError, ConfigError, KinswarmError, Result};
pub use types::{
    genotype::{GenotypeGroup, GenotypeSet},
    task::{TaskRequirement, DEFAULT_PRIORITY, MAX_REQUIRED_CAPABILITIES},
    worker::{Roster, Worker, DEFAULT_FITNESS},
};

/// Kinswarm version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
