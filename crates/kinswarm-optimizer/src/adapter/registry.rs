//! WorkerRegistry - current worker records and their observed fitness
//!
//! Optimization runs work on immutable roster snapshots. Fitness updates
//! land here, are audited when the value actually changes, and show up in
//! the next snapshot. Worker set and genotypes never change after
//! registration, so snapshot indices stay stable.

use std::sync::Arc;

use kinswarm_common::security::{AuditHandle, FitnessChange};
use kinswarm_common::{AdapterError, Result, Roster, Worker};
use parking_lot::RwLock;
use tracing::{debug, instrument};

use super::profile::{workers_from_profiles, WorkerProfile};

pub struct WorkerRegistry {
    roster: RwLock<Arc<Roster>>,
    audit: Option<AuditHandle>,
}

impl WorkerRegistry {
    pub fn new(workers: Vec<Worker>) -> Result<Self> {
        Ok(Self {
            roster: RwLock::new(Arc::new(Roster::new(workers)?)),
            audit: None,
        })
    }

    pub fn from_profiles(profiles: Vec<WorkerProfile>) -> Result<Self> {
        Self::new(workers_from_profiles(profiles)?)
    }

    /// Send fitness changes to an audit writer
    pub fn with_audit(mut self, handle: AuditHandle) -> Self {
        self.audit = Some(handle);
        self
    }

    /// Current roster; cheap to clone and safe to share across runs
    pub fn snapshot(&self) -> Arc<Roster> {
        self.roster.read().clone()
    }

    pub fn fitness_of(&self, name: &str) -> Option<f64> {
        let roster = self.roster.read();
        roster.index_of(name).map(|i| roster[i].fitness)
    }

    /// Record an externally observed fitness value.
    ///
    /// Returns `true` if the value changed (and an audit record was queued).
    /// Audit failures are logged by the writer and never surface here.
    #[instrument(skip(self))]
    pub fn observe_fitness(
        &self,
        name: &str,
        value: f64,
        source_tag: &str,
        task_id: Option<&str>,
    ) -> std::result::Result<bool, AdapterError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(AdapterError::FitnessOutOfRange {
                worker: name.to_string(),
                value,
            });
        }

        let mut guard = self.roster.write();
        let index = guard
            .index_of(name)
            .ok_or_else(|| AdapterError::UnknownWorker(name.to_string()))?;
        let old = guard[index].fitness;
        if old == value {
            return Ok(false);
        }

        let next = guard.with_fitness_at(index, value);
        *guard = Arc::new(next);
        drop(guard);

        debug!(old, new = value, "Worker fitness changed");
        if let Some(audit) = &self.audit {
            let mut change = FitnessChange::new(name, old, value, source_tag);
            if let Some(task) = task_id {
                change = change.with_task(task);
            }
            audit.record(change);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinswarm_common::security::{AuditLog, AuditRecorder};
    use kinswarm_common::GenotypeGroup;

    fn registry() -> WorkerRegistry {
        WorkerRegistry::new(vec![
            Worker::new("ada", "dev", GenotypeGroup::Altruist),
            Worker::new("grace", "dev", GenotypeGroup::Sentinel).with_fitness(0.7),
        ])
        .unwrap()
    }

    #[test]
    fn test_snapshot_is_stable_across_updates() {
        let registry = registry();
        let before = registry.snapshot();
        assert!(registry.observe_fitness("ada", 0.9, "review", None).unwrap());

        assert_eq!(before[0].fitness, 0.5);
        assert_eq!(registry.snapshot()[0].fitness, 0.9);
        assert_eq!(registry.fitness_of("ada"), Some(0.9));
    }

    #[test]
    fn test_unchanged_value_is_not_a_change() {
        let registry = registry();
        assert!(!registry.observe_fitness("grace", 0.7, "review", None).unwrap());
    }

    #[test]
    fn test_rejects_unknown_worker_and_bad_value() {
        let registry = registry();
        assert_eq!(
            registry.observe_fitness("bob", 0.5, "review", None),
            Err(AdapterError::UnknownWorker("bob".to_string()))
        );
        assert!(matches!(
            registry.observe_fitness("ada", 1.2, "review", None),
            Err(AdapterError::FitnessOutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_changes_are_audited() {
        let log = Arc::new(AuditLog::new());
        let (handle, join) = AuditRecorder::spawn(Arc::clone(&log), vec![]);
        let registry = registry().with_audit(handle);

        registry.observe_fitness("ada", 0.9, "review", Some("t-1")).unwrap();
        registry.observe_fitness("ada", 0.9, "review", Some("t-1")).unwrap();
        registry.observe_fitness("grace", 0.2, "optimizer", None).unwrap();
        drop(registry);
        join.await.unwrap();

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].worker_id, "ada");
        assert_eq!(entries[0].old_value, 0.5);
        assert_eq!(entries[0].task_id.as_deref(), Some("t-1"));
        assert_eq!(entries[1].source_tag, "optimizer");
        assert!(log.verify_chain().is_ok());
    }
}
