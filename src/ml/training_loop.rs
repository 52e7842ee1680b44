// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Drives optimizer steps with gradient accumulation:
//
//   for each optimizer step:
//     1. start a fresh gradient accumulator ("zero_grad")
//        and open the step in the profiler
//     2. k = batch / minibatch times:
//          pull record → forward → loss
//          loss_sum += loss (on device), tokens += input.numel()
//          backward(loss / k) → accumulate gradients
//     3. optimizer.step(accumulated gradients)
//     4. close the profiled step, read loss_sum back once
//     5. emit StepMetrics to every sink
//     6. stop if the step limit or token budget is reached
//
// Scaling each minibatch loss by 1/k before backward makes the
// accumulated gradient equal to the gradient of the mean loss
// over the whole batch, however finely it is split.
//
// The model and the optimizer are only touched here, once per
// optimizer step. A failed minibatch aborts the run; a failed
// metric sink is logged and skipped.
//
// Reference: Burn Book §5 (Training), GradientsAccumulator

use std::time::Instant;

use burn::{
    module::AutodiffModule,
    optim::{GradientsAccumulator, GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};

use crate::data::processor::Record;
use crate::domain::{
    error::TrainError,
    state::{RunSummary, StepMetrics, StopConditions, StopReason, TrainingState},
    traits::MetricSink,
};
use crate::infra::profiler::StepProfiler;
use crate::ml::{loss::LossFunction, model::SequenceModel};

/// Shape of one optimizer step: how many minibatches are accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulationSchedule {
    minibatches_per_step: usize,
}

impl AccumulationSchedule {
    pub fn new(batch_size: usize, minibatch_size: usize) -> Result<Self, TrainError> {
        if batch_size == 0 || minibatch_size == 0 {
            return Err(TrainError::config("batch and minibatch sizes must be positive"));
        }
        if batch_size % minibatch_size != 0 {
            return Err(TrainError::config(format!(
                "minibatch ({minibatch_size}) must divide batch ({batch_size})"
            )));
        }
        Ok(Self { minibatches_per_step: batch_size / minibatch_size })
    }

    pub fn minibatches_per_step(&self) -> usize {
        self.minibatches_per_step
    }
}

/// Per-step scratch, dropped once the optimizer has applied it.
struct Accumulation<B: AutodiffBackend, M> {
    grads:    GradientsAccumulator<M>,
    /// Sum of the unscaled minibatch losses, kept on the device
    loss_sum: Option<Tensor<B::InnerBackend, 1>>,
    tokens:   u64,
}

impl<B: AutodiffBackend, M> Accumulation<B, M> {
    fn new() -> Self {
        Self { grads: GradientsAccumulator::new(), loss_sum: None, tokens: 0 }
    }

    fn add_loss(&mut self, loss: Tensor<B::InnerBackend, 1>) {
        self.loss_sum = Some(match self.loss_sum.take() {
            Some(sum) => sum + loss,
            None      => loss,
        });
    }
}

enum StepOutcome<M> {
    Completed(M, StepMetrics),
    Exhausted(M),
}

pub struct TrainingLoop<'a> {
    schedule:      AccumulationSchedule,
    loss_fn:       LossFunction,
    learning_rate: f64,
    stop:          StopConditions,
    profiler:      StepProfiler,
    sinks:         Vec<Box<dyn MetricSink + 'a>>,
}

impl<'a> TrainingLoop<'a> {
    pub fn new(
        schedule:      AccumulationSchedule,
        loss_fn:       LossFunction,
        learning_rate: f64,
        stop:          StopConditions,
    ) -> Self {
        Self {
            schedule,
            loss_fn,
            learning_rate,
            stop,
            profiler: StepProfiler::disabled(),
            sinks: Vec::new(),
        }
    }

    pub fn with_profiler(mut self, profiler: StepProfiler) -> Self {
        self.profiler = profiler;
        self
    }

    pub fn with_sink(mut self, sink: impl MetricSink + 'a) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Run until a stop condition holds or the records run out.
    /// Returns the trained model with a summary of the run.
    pub fn run<B, M, O, I>(
        &mut self,
        mut model: M,
        optim:     &mut O,
        records:   &mut I,
        state:     &mut TrainingState,
    ) -> Result<(M, RunSummary), TrainError>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B> + SequenceModel<B>,
        O: Optimizer<M, B>,
        I: Iterator<Item = Result<Record<B>, TrainError>>,
    {
        let stop_reason = loop {
            if let Some(reason) = self.stop.reached(state) {
                break reason;
            }

            match self.train_step(model, optim, records, state)? {
                StepOutcome::Completed(next, metrics) => {
                    model = next;
                    self.emit(&metrics);
                }
                StepOutcome::Exhausted(_) if self.stop.has_limit() => {
                    return Err(TrainError::DataExhausted {
                        completed_steps: state.step,
                        tokens:          state.tokens,
                    });
                }
                StepOutcome::Exhausted(unchanged) => {
                    model = unchanged;
                    break StopReason::Exhausted;
                }
            }
        };

        let summary = RunSummary {
            steps:        state.step,
            tokens:       state.tokens,
            elapsed_secs: state.elapsed().as_secs_f64(),
            stop_reason,
        };
        tracing::info!(
            "Training stopped ({:?}) after {} steps, {} tokens, {:.1}s",
            summary.stop_reason,
            summary.steps,
            summary.tokens,
            summary.elapsed_secs
        );
        Ok((model, summary))
    }

    fn train_step<B, M, O, I>(
        &mut self,
        model:   M,
        optim:   &mut O,
        records: &mut I,
        state:   &mut TrainingState,
    ) -> Result<StepOutcome<M>, TrainError>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B> + SequenceModel<B>,
        O: Optimizer<M, B>,
        I: Iterator<Item = Result<Record<B>, TrainError>>,
    {
        let step_start = Instant::now();
        let k          = self.schedule.minibatches_per_step();

        // ── 1. zero_grad ─────────────────────────────────────────────────────
        let mut acc = Accumulation::<B, M>::new();
        self.profiler.begin_step(state.step);

        // ── 2. forward / backward over k minibatches ─────────────────────────
        for _ in 0..k {
            let record = match records.next() {
                Some(record) => record?,
                None => {
                    tracing::debug!("Data source exhausted at step {}", state.step);
                    return Ok(StepOutcome::Exhausted(model));
                }
            };

            let logits = self.profiler.span("forward", || model.logits(record.input.clone()));
            let loss   = self.profiler.span("loss", || self.loss_fn.compute(logits, &record))?;

            acc.add_loss(loss.clone().inner());
            acc.tokens   += record.num_tokens() as u64;

            let grads = self.profiler.span("backward", || {
                let grads = loss.div_scalar(k as f64).backward();
                GradientsParams::from_grads(grads, &model)
            });
            acc.grads.accumulate(&model, grads);
        }

        // ── 3. optimizer step ────────────────────────────────────────────────
        let grads = acc.grads.grads();
        let lr    = self.learning_rate;
        let model = self.profiler.span("optimizer_step", || optim.step(lr, model, grads));

        // ── 4. profiler, then the one host read of the step ──────────────────
        self.profiler.end_step();
        let loss_sum = acc.loss_sum.map_or(0.0, |sum| sum.into_scalar().elem::<f64>());

        // ── 5. commit state, build metrics ───────────────────────────────────
        let metrics = StepMetrics {
            step:         state.step,
            tokens:       state.tokens + acc.tokens,
            elapsed_time: state.elapsed().as_secs_f64(),
            train_loss:   loss_sum / k as f64,
            ms_per_step:  step_start.elapsed().as_secs_f64() * 1000.0,
        };
        state.step   += 1;
        state.tokens += acc.tokens;

        Ok(StepOutcome::Completed(model, metrics))
    }

    fn emit(&mut self, metrics: &StepMetrics) {
        for sink in &mut self.sinks {
            if let Err(e) = sink.record(metrics) {
                tracing::warn!("Metric sink '{}' failed at step {}: {:#}", sink.name(), metrics.step, e);
            }
        }
    }
}
