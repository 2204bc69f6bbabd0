//! Tracing setup and Prometheus metrics for the optimizer

use kinswarm_common::security::AuditHandle;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::swarm::{RunState, SwarmOutcome};

/// Install a global fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive`. Fails if a global subscriber is already set.
pub fn init_tracing(default_directive: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;
    Ok(())
}

/// Prometheus metrics for team searches
pub struct OptimizerMetrics {
    pub runs_total: IntCounter,
    pub runs_converged: IntCounter,
    pub runs_cancelled: IntCounter,
    pub iterations: Histogram,
    pub final_fitness: Histogram,
    pub evaluation_failures: IntCounter,
    pub audit_failures: IntGauge,
}

impl OptimizerMetrics {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            runs_total: IntCounter::new("kinswarm_runs_total", "Team searches completed")?,
            runs_converged: IntCounter::new(
                "kinswarm_runs_converged_total",
                "Team searches that converged before the iteration limit",
            )?,
            runs_cancelled: IntCounter::new(
                "kinswarm_runs_cancelled_total",
                "Team searches stopped by a caller budget",
            )?,
            iterations: Histogram::with_opts(
                HistogramOpts::new("kinswarm_run_iterations", "Iterations per team search")
                    .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 75.0, 100.0, 250.0, 500.0, 1000.0]),
            )?,
            final_fitness: Histogram::with_opts(
                HistogramOpts::new("kinswarm_run_final_fitness", "Best fitness per team search")
                    .buckets(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.95, 1.0]),
            )?,
            evaluation_failures: IntCounter::new(
                "kinswarm_evaluation_failures_total",
                "Particle evaluations that produced a non-finite fitness",
            )?,
            audit_failures: IntGauge::new(
                "kinswarm_audit_write_failures",
                "Fitness audit records that failed to reach a sink",
            )?,
        })
    }

    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.runs_total.clone()))?;
        registry.register(Box::new(self.runs_converged.clone()))?;
        registry.register(Box::new(self.runs_cancelled.clone()))?;
        registry.register(Box::new(self.iterations.clone()))?;
        registry.register(Box::new(self.final_fitness.clone()))?;
        registry.register(Box::new(self.evaluation_failures.clone()))?;
        registry.register(Box::new(self.audit_failures.clone()))?;
        Ok(())
    }

    pub fn observe(&self, outcome: &SwarmOutcome) {
        self.runs_total.inc();
        match outcome.termination.state() {
            RunState::Converged => self.runs_converged.inc(),
            RunState::Cancelled => self.runs_cancelled.inc(),
            _ => {}
        }
        self.iterations.observe(outcome.iterations_run as f64);
        self.final_fitness.observe(outcome.best_fitness);
        self.evaluation_failures.inc_by(outcome.evaluation_failures);
    }

    /// Publish the writer's failure count
    pub fn observe_audit(&self, handle: &AuditHandle) {
        self.audit_failures.set(handle.failures() as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swarm::{CancelReason, Termination};

    fn outcome(termination: Termination) -> SwarmOutcome {
        SwarmOutcome {
            best_team: vec![0, 1],
            best_fitness: 0.8,
            fitness_history: vec![0.7, 0.8],
            snapshots: vec![],
            iterations_run: 2,
            convergence_iteration: 2,
            termination,
            seed: 1,
            evaluations: 60,
            evaluation_failures: 1,
        }
    }

    #[test]
    fn test_register_and_observe() {
        let registry = Registry::new();
        let metrics = OptimizerMetrics::new().unwrap();
        metrics.register(&registry).unwrap();

        metrics.observe(&outcome(Termination::Plateau));
        metrics.observe(&outcome(Termination::Cancelled(CancelReason::Deadline)));
        metrics.observe(&outcome(Termination::MaxIterationsReached));

        assert_eq!(metrics.runs_total.get(), 3);
        assert_eq!(metrics.runs_converged.get(), 1);
        assert_eq!(metrics.runs_cancelled.get(), 1);
        assert_eq!(metrics.evaluation_failures.get(), 3);
        assert_eq!(registry.gather().len(), 7);
    }

    #[tokio::test]
    async fn test_audit_failures_published() {
        use kinswarm_common::security::{AuditLog, AuditRecorder};
        use std::sync::Arc;

        let metrics = OptimizerMetrics::new().unwrap();
        let (handle, join) = AuditRecorder::spawn(Arc::new(AuditLog::new()), vec![]);
        metrics.observe_audit(&handle);
        assert_eq!(metrics.audit_failures.get(), 0);
        drop(handle);
        join.await.unwrap();
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        let metrics = OptimizerMetrics::new().unwrap();
        metrics.register(&registry).unwrap();
        assert!(metrics.register(&registry).is_err());
    }
}
