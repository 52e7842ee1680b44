// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the `train` subcommand and all its flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for malformed values
//   - type conversion (string → usize, f64, enums via FromStr)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::{TrainConfig, BYTE_VOCAB};
use crate::domain::objective::Objective;
use crate::ml::model::PositionalEncodingKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a sequence model on a byte-level text corpus
    Train(TrainArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Number of transformer blocks
    #[arg(long, default_value_t = 2)]
    pub layers: usize,

    /// Hidden width (defaults to 128 × layers)
    #[arg(long)]
    pub d_model: Option<usize>,

    /// Width of one attention head; d_model must be a multiple of it
    #[arg(long, default_value_t = 64)]
    pub d_head: usize,

    /// Context length in tokens
    #[arg(long, default_value_t = 128)]
    pub n_ctx: usize,

    /// Vocabulary size (at least 256 for byte tokens)
    #[arg(long, default_value_t = BYTE_VOCAB)]
    pub vocab: usize,

    /// Corpus file, or directory whose files are concatenated
    #[arg(long, default_value = "data")]
    pub data: String,

    /// Sequences per optimizer step
    #[arg(long, default_value_t = 32)]
    pub batch: usize,

    /// Sequences per forward/backward pass; must divide --batch
    #[arg(long, default_value_t = 8)]
    pub minibatch: usize,

    /// Compute device: cpu, wgpu or cuda
    #[arg(long, default_value = "cpu")]
    pub device: String,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Positional encoding: none, sin or learned
    #[arg(long, default_value_t = PositionalEncodingKind::None)]
    pub pe: PositionalEncodingKind,

    /// Training objective: autoregressive or masked
    #[arg(long, default_value_t = Objective::Autoregressive)]
    pub objective: Objective,

    /// Fraction of tokens hidden per sample (masked objective)
    #[arg(long, default_value_t = 0.15)]
    pub mask_prob: f64,

    /// Stop after this many optimizer steps
    #[arg(long)]
    pub steps: Option<usize>,

    /// Stop once this many input tokens were consumed
    #[arg(long)]
    pub tokens: Option<u64>,

    /// Steps to profile, comma separated (e.g. 5,20)
    #[arg(long, value_delimiter = ',')]
    pub profile_steps: Vec<usize>,

    /// Directory for the config snapshot, metrics and traces
    #[arg(long, default_value = "runs/latest")]
    pub out_dir: String,

    /// Write metrics.csv into the output directory
    #[arg(long, overrides_with = "no_metrics_csv")]
    pub metrics_csv: bool,

    #[arg(long = "no-metrics-csv", overrides_with = "metrics_csv")]
    pub no_metrics_csv: bool,

    /// Replay the corpus indefinitely
    #[arg(long)]
    pub cycle: bool,

    /// Seed for shuffling and mask sampling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data:          a.data,
            out_dir:       a.out_dir,
            n_layer:       a.layers,
            d_model:       a.d_model.unwrap_or(128 * a.layers),
            d_head:        a.d_head,
            n_ctx:         a.n_ctx,
            n_vocab:       a.vocab,
            positional:    a.pe,
            objective:     a.objective,
            mask_prob:     a.mask_prob,
            batch:         a.batch,
            minibatch:     a.minibatch,
            device:        a.device,
            lr:            a.lr,
            steps:         a.steps,
            tokens:        a.tokens,
            profile_steps: a.profile_steps,
            metrics_csv:   a.metrics_csv || !a.no_metrics_csv,
            cycle:         a.cycle,
            seed:          a.seed,
        }
    }
}
