//! Core domain types
pub mod genotype;
pub mod task;
pub mod worker;
