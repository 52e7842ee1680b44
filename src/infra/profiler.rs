// ============================================================
// Layer 6 — Step Profiler and Trace Writer
// ============================================================
// StepProfiler follows the ProfileScheduler one optimizer step
// at a time:
//
//   Idle           spans run untimed, nothing is kept
//   Warmup         spans are timed and then thrown away, so the
//                  recorded step does not pay first-use costs
//   RecordAndSave  spans are timed and handed to the TraceSink
//                  when the step completes
//
// ChromeTraceWriter stores a recorded step as Chrome trace-event
// JSON (open it in chrome://tracing or ui.perfetto.dev):
//
//   <dir>/step_<n>.trace.json
//
// Trace persistence never fails the run: errors are logged.
//
// Reference: Chrome Trace Event Format ("X" complete events)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs,
    path::PathBuf,
    time::Instant,
};

use crate::domain::{
    profile::{ProfileAction, ProfileScheduler},
    traits::{TraceSink, TraceSpan},
};

/// Has no step counter of its own: the training loop passes in the
/// run's step index when a step begins.
pub struct StepProfiler {
    scheduler:  ProfileScheduler,
    sink:       Option<Box<dyn TraceSink>>,
    /// Step currently being timed, as supplied by the caller
    step:       usize,
    action:     ProfileAction,
    step_start: Instant,
    spans:      Vec<TraceSpan>,
}

impl StepProfiler {
    pub fn new(scheduler: ProfileScheduler, sink: Box<dyn TraceSink>) -> Self {
        Self {
            scheduler,
            sink:       Some(sink),
            step:       0,
            action:     ProfileAction::Idle,
            step_start: Instant::now(),
            spans:      Vec::new(),
        }
    }

    /// A profiler that never records anything.
    pub fn disabled() -> Self {
        Self {
            scheduler:  ProfileScheduler::default(),
            sink:       None,
            step:       0,
            action:     ProfileAction::Idle,
            step_start: Instant::now(),
            spans:      Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn action(&self) -> ProfileAction {
        self.action
    }

    /// Open `step`; spans from an unfinished previous step are dropped.
    pub fn begin_step(&mut self, step: usize) {
        self.step       = step;
        self.action     = self.scheduler.action(step);
        self.step_start = Instant::now();
        self.spans.clear();

        if self.action == ProfileAction::RecordAndSave {
            tracing::info!("Profiling step {step}...");
        }
    }

    /// Run `f`, timing it as `name` when the current step is profiled.
    pub fn span<T>(&mut self, name: &'static str, f: impl FnOnce() -> T) -> T {
        if !self.action.is_active() {
            return f();
        }
        let start = Instant::now();
        let out   = f();
        self.spans.push(TraceSpan {
            name,
            start:    start.duration_since(self.step_start),
            duration: start.elapsed(),
        });
        out
    }

    /// Close the step opened by `begin_step`, saving it if it was a target.
    pub fn end_step(&mut self) {
        let spans = std::mem::take(&mut self.spans);

        if self.action == ProfileAction::RecordAndSave {
            if let Some(sink) = self.sink.as_mut() {
                match sink.persist(self.step, &spans) {
                    Ok(path) => tracing::info!("Saved profile for step {} to '{}'", self.step, path.display()),
                    Err(e)   => tracing::warn!("Could not save profile for step {}: {:#}", self.step, e),
                }
            }
        }
        self.action = ProfileAction::Idle;
    }
}

// ─── Chrome trace output ──────────────────────────────────────────────────────
#[derive(Serialize)]
struct TraceEvent {
    name: &'static str,
    cat:  &'static str,
    ph:   &'static str,
    /// microseconds
    ts:   f64,
    dur:  f64,
    pid:  u32,
    tid:  u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TraceFile {
    trace_events:      Vec<TraceEvent>,
    display_time_unit: &'static str,
    step:              usize,
}

pub struct ChromeTraceWriter {
    dir: PathBuf,
}

impl ChromeTraceWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, step: usize) -> PathBuf {
        self.dir.join(format!("step_{step}.trace.json"))
    }
}

impl TraceSink for ChromeTraceWriter {
    fn persist(&mut self, step: usize, spans: &[TraceSpan]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create profile directory '{}'", self.dir.display()))?;

        let file = TraceFile {
            trace_events: spans
                .iter()
                .map(|s| TraceEvent {
                    name: s.name,
                    cat:  "train",
                    ph:   "X",
                    ts:   s.start.as_secs_f64() * 1e6,
                    dur:  s.duration.as_secs_f64() * 1e6,
                    pid:  1,
                    tid:  1,
                })
                .collect(),
            display_time_unit: "ms",
            step,
        };

        let path = self.path_for(step);
        fs::write(&path, serde_json::to_string_pretty(&file)?)
            .with_context(|| format!("Cannot write trace '{}'", path.display()))?;
        Ok(path)
    }
}
