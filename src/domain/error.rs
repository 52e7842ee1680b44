// ============================================================
// Layer 3 — Training Error Taxonomy
// ============================================================
// Every failure the training engine can raise on its own.
//
//   Config         — invalid option combination, raised by
//                    TrainConfig::validate() before the loop
//   Shape          — tensor shapes break the processor / loss
//                    contract (data or model mismatch)
//   Device         — the requested compute device is not available
//   DataExhausted  — the source ran dry before the requested
//                    step limit or token budget was reached
//
// Instrumentation failures (metric sinks, trace files) are NOT
// part of this enum: they are logged where they happen and never
// reach the caller.
//
// Reference: thiserror crate documentation
//            Rust Book §9 (Recoverable Errors with Result)

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("device unavailable: {0}")]
    Device(String),

    #[error("data source exhausted after {completed_steps} steps ({tokens} tokens) before the requested limit")]
    DataExhausted { completed_steps: usize, tokens: u64 },
}

impl TrainError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }
}
