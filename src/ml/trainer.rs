// ============================================================
// Layer 5 — Training Run Assembly
// ============================================================
// Builds everything the TrainingLoop needs for one run and hands
// control to it:
//
//   model      Transformer on the resolved backend
//   optimizer  AdamW at the configured learning rate
//   records    DataLoader (minibatch sized, seeded shuffle)
//              → BatchProcessor stream
//   sinks      LogSink, plus CsvMetricsLogger unless disabled
//   profiler   StepProfiler writing Chrome traces, when any
//              profile steps were requested
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::Module,
    optim::AdamWConfig,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{RawRecord, TextBatcher},
    dataset::TextDataset,
    processor::BatchProcessor,
};
use crate::domain::{
    profile::ProfileScheduler,
    state::{RunSummary, TrainingState},
};
use crate::infra::{
    metrics::{CsvMetricsLogger, LogSink},
    profiler::{ChromeTraceWriter, StepProfiler},
    run_dir::RunDirectory,
};
use crate::ml::{
    backend::{ComputeDevice, CpuBackend},
    loss::LossFunction,
    model::{SequenceModel, Transformer, TransformerConfig},
    training_loop::TrainingLoop,
};

const GIB: f64 = (1u64 << 30) as f64;

pub fn run_training(
    cfg:     &TrainConfig,
    device:  ComputeDevice,
    dataset: TextDataset,
    run_dir: &RunDirectory,
) -> Result<RunSummary> {
    match device {
        ComputeDevice::Cpu => {
            train_on::<CpuBackend>(cfg, dataset, run_dir, burn::backend::ndarray::NdArrayDevice::Cpu)
        }
        #[cfg(feature = "wgpu")]
        ComputeDevice::Wgpu => train_on::<crate::ml::backend::WgpuBackend>(
            cfg,
            dataset,
            run_dir,
            burn::backend::wgpu::WgpuDevice::default(),
        ),
    }
}

fn train_on<B: AutodiffBackend>(
    cfg:     &TrainConfig,
    dataset: TextDataset,
    run_dir: &RunDirectory,
    device:  B::Device,
) -> Result<RunSummary> {
    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = TransformerConfig::new(
        cfg.n_layer,
        cfg.d_model,
        cfg.d_head,
        cfg.n_ctx,
        cfg.n_vocab,
        cfg.positional,
        cfg.objective.is_causal(),
    );
    let model: Transformer<B> = model_cfg.init(&device);

    let total_params = model.num_params();
    let param_bytes  = total_params * std::mem::size_of::<B::FloatElem>();
    tracing::info!(
        "Model ready: {} layers, {} non-embedding params, {} total params ({:.3} GiB)",
        cfg.n_layer,
        model.n_parameters(),
        total_params,
        param_bytes as f64 / GIB,
    );

    // ── AdamW optimiser ───────────────────────────────────────────────────────
    let mut optim = AdamWConfig::new().init();

    // ── Data loader → processed records ───────────────────────────────────────
    let n_samples = dataset.len();
    let loader = DataLoaderBuilder::new(TextBatcher::<B>::new(device.clone()))
        .batch_size(cfg.minibatch)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(dataset);

    // An empty loader would make the replay spin without yielding
    let source: Box<dyn Iterator<Item = RawRecord<B>> + '_> = if cfg.cycle && n_samples > 0 {
        Box::new(std::iter::repeat_with(|| loader.iter()).flatten())
    } else {
        if cfg.cycle {
            tracing::warn!("Corpus is empty, nothing to cycle over");
        }
        Box::new(loader.iter())
    };
    let mut records = BatchProcessor::from(cfg.objective).stream(source, device);

    // ── Training loop with its sinks and profiler ─────────────────────────────
    let mut training = TrainingLoop::new(
        cfg.schedule()?,
        LossFunction::new(cfg.objective, cfg.n_vocab),
        cfg.lr,
        cfg.stop_conditions(),
    )
    .with_sink(LogSink);

    if cfg.metrics_csv {
        match CsvMetricsLogger::new(run_dir.path()) {
            Ok(csv) => {
                tracing::info!("Writing metrics to '{}'", csv.csv_path().display());
                training = training.with_sink(csv);
            }
            Err(e) => tracing::warn!("Metrics CSV disabled: {e:#}"),
        }
    }

    let scheduler = ProfileScheduler::new(cfg.profile_steps.iter().copied());
    if !scheduler.is_empty() {
        let targets: Vec<String> = scheduler.targets().map(|s| s.to_string()).collect();
        tracing::info!("Profiling steps [{}]", targets.join(", "));
        let writer = ChromeTraceWriter::new(run_dir.profile_dir());
        training = training.with_profiler(StepProfiler::new(scheduler, Box::new(writer)));
    }

    let mut state = TrainingState::new();
    let (_model, summary) = training.run(model, &mut optim, &mut records, &mut state)?;
    Ok(summary)
}
