//! Countdown clock shared by every unit of work in one request

use std::time::{Duration, Instant};

use crate::error::{PipelineError, PipelineResult};

/// Request-wide budget. Read-only after [`Deadline::start`], so it can be
/// copied into concurrent file futures freely.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started_at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Starts the clock now
    pub fn start(budget: Duration) -> Self {
        Self::started_at(Instant::now(), budget)
    }

    /// Starts the clock at a given instant
    pub fn started_at(started_at: Instant, budget: Duration) -> Self {
        Self { started_at, budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    /// Never negative; zero once the budget is spent
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.elapsed())
    }

    pub fn remaining_seconds(&self) -> f64 {
        self.remaining().as_secs_f64()
    }

    pub fn expired(&self) -> bool {
        self.elapsed() > self.budget
    }

    /// Fails with `DeadlineExceeded` once the budget is spent.
    /// Called before every file and every step inside a file.
    pub fn ensure_active(&self) -> PipelineResult<()> {
        if self.expired() {
            return Err(PipelineError::DeadlineExceeded);
        }
        Ok(())
    }
}
