//! Compatibility model
pub mod matrix;

pub use self::matrix::{jaccard, CompatibilityMatrix};
