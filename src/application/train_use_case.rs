// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one training run in order:
//
//   Step 1: Validate the configuration     (Layer 2)
//   Step 2: Resolve the compute device     (Layer 5 - ml)
//   Step 3: Load the byte corpus           (Layer 4 - data)
//   Step 4: Cut it into training windows   (Layer 4 - data)
//   Step 5: Create the run directory       (Layer 6 - infra)
//   Step 6: Save the resolved config       (Layer 6 - infra)
//   Step 7: Run the training loop          (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::{dataset::TextDataset, loader::CorpusLoader};
use crate::domain::{
    error::TrainError,
    objective::Objective,
    state::{RunSummary, StopConditions},
};
use crate::infra::run_dir::RunDirectory;
use crate::ml::{
    backend::ComputeDevice,
    model::PositionalEncodingKind,
    trainer::run_training,
    training_loop::AccumulationSchedule,
};

/// Size of the byte alphabet every corpus is tokenised into.
pub const BYTE_VOCAB: usize = 256;

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a run needs, saved next to its metrics so a run
// directory documents how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data:      String,
    pub out_dir:   String,

    pub n_layer:    usize,
    pub d_model:    usize,
    pub d_head:     usize,
    pub n_ctx:      usize,
    pub n_vocab:    usize,
    pub positional: PositionalEncodingKind,

    pub objective: Objective,
    /// Fraction of tokens hidden per sample (masked objective only)
    pub mask_prob: f64,

    pub batch:     usize,
    pub minibatch: usize,
    pub device:    String,
    pub lr:        f64,

    pub steps:         Option<usize>,
    pub tokens:        Option<u64>,
    pub profile_steps: Vec<usize>,

    pub metrics_csv: bool,
    /// Replay the corpus epoch after epoch instead of stopping at its end
    pub cycle:       bool,
    pub seed:        u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data:          "data".to_string(),
            out_dir:       "runs/latest".to_string(),
            n_layer:       2,
            d_model:       256,
            d_head:        64,
            n_ctx:         128,
            n_vocab:       BYTE_VOCAB,
            positional:    PositionalEncodingKind::None,
            objective:     Objective::Autoregressive,
            mask_prob:     0.15,
            batch:         32,
            minibatch:     8,
            device:        "cpu".to_string(),
            lr:            1e-3,
            steps:         None,
            tokens:        None,
            profile_steps: Vec::new(),
            metrics_csv:   true,
            cycle:         false,
            seed:          42,
        }
    }
}

impl TrainConfig {
    /// Reject option combinations the engine cannot run.
    pub fn validate(&self) -> Result<(), TrainError> {
        AccumulationSchedule::new(self.batch, self.minibatch)?;

        if self.n_layer == 0 {
            return Err(TrainError::config("at least one layer is required"));
        }
        if self.d_head == 0 || self.d_model % self.d_head != 0 {
            return Err(TrainError::config(format!(
                "d_model ({}) must be a multiple of d_head ({})",
                self.d_model, self.d_head
            )));
        }
        if self.n_ctx < 2 {
            return Err(TrainError::config(format!("n_ctx must be at least 2, got {}", self.n_ctx)));
        }
        if self.n_vocab < BYTE_VOCAB {
            return Err(TrainError::config(format!(
                "vocabulary ({}) cannot hold the {BYTE_VOCAB} byte tokens",
                self.n_vocab
            )));
        }
        if self.lr.is_nan() || self.lr <= 0.0 {
            return Err(TrainError::config(format!("learning rate must be positive, got {}", self.lr)));
        }
        if self.objective == Objective::Masked && !(self.mask_prob > 0.0 && self.mask_prob < 1.0) {
            return Err(TrainError::config(format!(
                "mask probability must lie in (0, 1), got {}",
                self.mask_prob
            )));
        }
        if self.steps == Some(0) {
            return Err(TrainError::config("step limit must be positive"));
        }
        if self.tokens == Some(0) {
            return Err(TrainError::config("token budget must be positive"));
        }
        Ok(())
    }

    pub fn schedule(&self) -> Result<AccumulationSchedule, TrainError> {
        AccumulationSchedule::new(self.batch, self.minibatch)
    }

    pub fn stop_conditions(&self) -> StopConditions {
        StopConditions { max_steps: self.steps, max_tokens: self.tokens }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<RunSummary> {
        let cfg = &self.config;

        // ── Step 1: Fail fast on bad options ──────────────────────────────────
        cfg.validate()?;

        // ── Step 2: The device must exist before any data is touched ──────────
        let device: ComputeDevice = cfg.device.parse()?;
        tracing::info!("Using device: {device}");

        // ── Step 3: Load the corpus as raw bytes ──────────────────────────────
        tracing::info!("Loading corpus from '{}'", cfg.data);
        let corpus = CorpusLoader::new(&cfg.data).load()?;
        tracing::info!("Loaded {} bytes", corpus.len());

        // ── Step 4: Cut into fixed windows ────────────────────────────────────
        let dataset = TextDataset::new(corpus, cfg.n_ctx, cfg.objective, cfg.mask_prob, cfg.seed);
        tracing::info!(
            "Built {} samples of {} tokens ({} objective)",
            dataset.len(),
            dataset.window(),
            cfg.objective
        );

        // ── Step 5 + 6: Run directory and config snapshot ─────────────────────
        let run_dir = RunDirectory::create(&cfg.out_dir)?;
        run_dir.save_config(cfg)?;

        // ── Step 7: Train ─────────────────────────────────────────────────────
        run_training(cfg, device, dataset, &run_dir)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::StopReason;

    fn assert_config_error(cfg: TrainConfig) {
        match cfg.validate() {
            Err(TrainError::Config(_)) => {}
            other => panic!("expected a configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_is_valid() {
        TrainConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_indivisible_batch() {
        assert_config_error(TrainConfig { batch: 10, minibatch: 4, ..TrainConfig::default() });
        assert_config_error(TrainConfig { minibatch: 0, ..TrainConfig::default() });
    }

    #[test]
    fn test_rejects_bad_model_shape() {
        assert_config_error(TrainConfig { d_model: 100, d_head: 64, ..TrainConfig::default() });
        assert_config_error(TrainConfig { n_ctx: 1, ..TrainConfig::default() });
        assert_config_error(TrainConfig { n_vocab: 128, ..TrainConfig::default() });
    }

    #[test]
    fn test_rejects_bad_optimisation_settings() {
        assert_config_error(TrainConfig { lr: 0.0, ..TrainConfig::default() });
        assert_config_error(TrainConfig { lr: f64::NAN, ..TrainConfig::default() });
        assert_config_error(TrainConfig { steps: Some(0), ..TrainConfig::default() });
        assert_config_error(TrainConfig { tokens: Some(0), ..TrainConfig::default() });
    }

    #[test]
    fn test_mask_prob_only_checked_for_masked_objective() {
        let ar = TrainConfig { mask_prob: 0.0, ..TrainConfig::default() };
        ar.validate().unwrap();
        assert_config_error(TrainConfig { objective: Objective::Masked, ..ar });
    }

    #[test]
    fn test_unknown_device_fails_before_writing_anything() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            device:  "cuda".into(),
            out_dir: tmp.path().join("run").display().to_string(),
            ..TrainConfig::default()
        };
        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(matches!(err.downcast_ref::<TrainError>(), Some(TrainError::Device(_))));
        assert!(!tmp.path().join("run").exists());
    }

    #[test]
    fn test_end_to_end_cpu_run() {
        let tmp    = tempfile::tempdir().unwrap();
        let corpus = tmp.path().join("corpus.txt");
        std::fs::write(&corpus, "the quick brown fox jumps over the lazy dog. ".repeat(20)).unwrap();

        let out = tmp.path().join("run");
        let cfg = TrainConfig {
            data:          corpus.display().to_string(),
            out_dir:       out.display().to_string(),
            n_layer:       1,
            d_model:       32,
            d_head:        16,
            n_ctx:         16,
            batch:         4,
            minibatch:     2,
            steps:         Some(3),
            profile_steps: vec![1],
            cycle:         true,
            ..TrainConfig::default()
        };

        let summary = TrainUseCase::new(cfg).execute().unwrap();
        assert_eq!(summary.steps, 3);
        assert_eq!(summary.tokens, 3 * 4 * 16);
        assert_eq!(summary.stop_reason, StopReason::StepLimit);

        assert!(out.join("train_config.json").exists());
        assert!(out.join("profile/step_1.trace.json").exists());
        let csv = std::fs::read_to_string(out.join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 4);
    }
}
