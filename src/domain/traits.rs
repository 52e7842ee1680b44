// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between the training loop and its observers.
//
//   MetricSink — receives one StepMetrics per optimizer step
//                (LogSink, CsvMetricsLogger in Layer 6)
//   TraceSink  — persists the spans captured for a profiled
//                step (ChromeTraceWriter in Layer 6)
//
// Both are best-effort: the loop logs an Err from either and
// keeps training.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::domain::state::StepMetrics;

// ─── MetricSink ───────────────────────────────────────────────────────────────
/// Anything that accepts per-step training metrics.
pub trait MetricSink {
    /// Short name used in log messages when the sink fails.
    fn name(&self) -> &str;

    fn record(&mut self, metrics: &StepMetrics) -> Result<()>;
}

// ─── TraceSink ────────────────────────────────────────────────────────────────
/// One timed region captured while profiling a step.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceSpan {
    pub name:     &'static str,
    /// Offset from the start of the profiled step
    pub start:    Duration,
    pub duration: Duration,
}

/// Persists the spans of one recorded step and returns where they went.
pub trait TraceSink {
    fn persist(&mut self, step: usize, spans: &[TraceSpan]) -> Result<PathBuf>;
}
