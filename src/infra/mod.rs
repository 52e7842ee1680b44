// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Side-effecting collaborators of the training loop:
//
//   metrics.rs  — MetricSink implementations: a tracing log
//                 line and a CSV file per run
//
//   profiler.rs — StepProfiler (follows the ProfileScheduler,
//                 times the step's phases) and the Chrome
//                 trace writer for recorded steps
//
//   run_dir.rs  — the run's output directory and its saved
//                 configuration
//
// Nothing in here may fail a training run: the loop logs
// sink and trace errors and carries on.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// Per-step metric sinks
pub mod metrics;

/// Step profiler and trace persistence
pub mod profiler;

/// Output directory layout and config persistence
pub mod run_dir;
