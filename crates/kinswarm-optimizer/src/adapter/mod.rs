//! Boundary adapter: external worker profiles in, audited fitness changes out
pub mod profile;
pub mod registry;

pub use self::profile::{load_roster_json, WorkerProfile};
pub use self::registry::WorkerRegistry;
