//! Caller-side run limits, checked between iterations

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Why a run was cut short
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    IterationBudget,
    Deadline,
    Requested,
}

/// Iteration, wall-clock, and cooperative-cancel limits for one run
#[derive(Debug, Clone, Default)]
pub struct RunBudget {
    /// Iterations this caller allows (on top of `max_iterations`)
    pub iteration_limit: Option<usize>,
    pub deadline: Option<Instant>,
    /// Set to `true` from any thread to stop the run
    pub cancel: Option<Arc<AtomicBool>>,
}

impl RunBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_iteration_limit(mut self, limit: usize) -> Self {
        self.iteration_limit = Some(limit);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Reason to stop before starting iteration `completed + 1`
    pub fn exhausted(&self, completed: usize) -> Option<CancelReason> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return Some(CancelReason::Requested);
            }
        }
        if let Some(limit) = self.iteration_limit {
            if completed >= limit {
                return Some(CancelReason::IterationBudget);
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Some(CancelReason::Deadline);
            }
        }
        None
    }
}
