// ============================================================
// Layer 3 — Profile Scheduler
// ============================================================
// Maps an optimizer step index to what the profiler should do
// during that step:
//
//   step in targets        → RecordAndSave
//   step + 1 in targets    → Warmup
//   otherwise              → Idle
//
// The scheduler is pure: it owns the target set and nothing else.
// The running step counter belongs to the caller (StepProfiler in
// the infra layer), which also does all of the file I/O.
//
// Example with targets {5}:
//   step:   3     4       5               6
//   action: Idle  Warmup  RecordAndSave   Idle

use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileAction {
    Idle,
    Warmup,
    RecordAndSave,
}

impl ProfileAction {
    /// True when spans should be collected during the step.
    pub fn is_active(self) -> bool {
        !matches!(self, ProfileAction::Idle)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileScheduler {
    targets: BTreeSet<usize>,
}

impl ProfileScheduler {
    pub fn new(targets: impl IntoIterator<Item = usize>) -> Self {
        Self { targets: targets.into_iter().collect() }
    }

    pub fn action(&self, step: usize) -> ProfileAction {
        if self.targets.contains(&step) {
            ProfileAction::RecordAndSave
        } else if self.targets.contains(&(step + 1)) {
            ProfileAction::Warmup
        } else {
            ProfileAction::Idle
        }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn targets(&self) -> impl Iterator<Item = usize> + '_ {
        self.targets.iter().copied()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_target_window() {
        let s = ProfileScheduler::new([5]);
        assert_eq!(s.action(4), ProfileAction::Warmup);
        assert_eq!(s.action(5), ProfileAction::RecordAndSave);
        for step in (0..4).chain(6..20) {
            assert_eq!(s.action(step), ProfileAction::Idle, "step {step}");
        }
    }

    #[test]
    fn test_empty_set_is_always_idle() {
        let s = ProfileScheduler::default();
        assert!(s.is_empty());
        assert!((0..100).all(|step| s.action(step) == ProfileAction::Idle));
    }

    #[test]
    fn test_adjacent_targets_record_both() {
        // 3 is a target itself, so recording wins over warm-up
        let s = ProfileScheduler::new([3, 4]);
        assert_eq!(s.action(2), ProfileAction::Warmup);
        assert_eq!(s.action(3), ProfileAction::RecordAndSave);
        assert_eq!(s.action(4), ProfileAction::RecordAndSave);
        assert_eq!(s.action(5), ProfileAction::Idle);
    }

    #[test]
    fn test_target_zero_has_no_warmup() {
        let s = ProfileScheduler::new([0]);
        assert_eq!(s.action(0), ProfileAction::RecordAndSave);
        assert_eq!(s.action(1), ProfileAction::Idle);
    }
}
