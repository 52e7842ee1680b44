// ============================================================
// Layer 3 — Training State and Step Metrics
// ============================================================
// TrainingState is the run-wide context threaded through the
// training loop: step counter, cumulative tokens and the wall
// clock origin. It is created once per run and mutated only
// when an optimizer step completes.
//
// StepMetrics is the flat record emitted to every MetricSink
// after each optimizer step.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct TrainingState {
    /// Index of the next optimizer step (0-based)
    pub step: usize,
    /// Tokens consumed by all completed steps
    pub tokens: u64,
    pub start: Instant,
}

impl TrainingState {
    pub fn new() -> Self {
        Self { step: 0, tokens: 0, start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for TrainingState {
    fn default() -> Self {
        Self::new()
    }
}

/// When the run should stop. Both limits are optional; with neither
/// set the run ends when the data source does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopConditions {
    pub max_steps:  Option<usize>,
    pub max_tokens: Option<u64>,
}

impl StopConditions {
    pub fn has_limit(&self) -> bool {
        self.max_steps.is_some() || self.max_tokens.is_some()
    }

    /// Checked at step boundaries only.
    pub fn reached(&self, state: &TrainingState) -> Option<StopReason> {
        if self.max_steps.is_some_and(|max| state.step >= max) {
            return Some(StopReason::StepLimit);
        }
        if self.max_tokens.is_some_and(|max| state.tokens >= max) {
            return Some(StopReason::TokenBudget);
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    StepLimit,
    TokenBudget,
    Exhausted,
}

/// One row of per-step metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct StepMetrics {
    pub step:         usize,
    pub tokens:       u64,
    /// Seconds since the run started
    pub elapsed_time: f64,
    /// Mean of the per-minibatch losses of this step
    pub train_loss:   f64,
    pub ms_per_step:  f64,
}

impl StepMetrics {
    /// CSV column names following the step index.
    pub const COLUMNS: [&'static str; 4] = ["tokens", "elapsed_time", "train_loss", "ms_per_step"];
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub steps:        usize,
    pub tokens:       u64,
    pub elapsed_secs: f64,
    pub stop_reason:  StopReason,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_limits_never_stops() {
        let stop  = StopConditions::default();
        let mut s = TrainingState::new();
        s.step   = 1_000_000;
        s.tokens = u64::MAX;
        assert!(!stop.has_limit());
        assert_eq!(stop.reached(&s), None);
    }

    #[test]
    fn test_token_budget_is_inclusive() {
        let stop  = StopConditions { max_steps: None, max_tokens: Some(1000) };
        let mut s = TrainingState::new();
        s.tokens = 999;
        assert_eq!(stop.reached(&s), None);
        s.tokens = 1000;
        assert_eq!(stop.reached(&s), Some(StopReason::TokenBudget));
    }

    #[test]
    fn test_step_limit_checked_first() {
        let stop  = StopConditions { max_steps: Some(2), max_tokens: Some(10) };
        let mut s = TrainingState::new();
        s.step   = 2;
        s.tokens = 50;
        assert_eq!(stop.reached(&s), Some(StopReason::StepLimit));
    }
}
