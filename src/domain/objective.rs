// ============================================================
// Layer 3 — Training Objective
// ============================================================
// The objective picks, once per run, which BatchProcessor and
// LossFunction variants are paired together:
//
//   Autoregressive → predict token t+1 from tokens 0..=t
//                    (causal attention)
//   Masked         → recover the original token at positions
//                    replaced by MASK_TOKEN (bidirectional)

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::error::TrainError;

/// Reserved token id written over hidden positions by the masked objective.
pub const MASK_TOKEN: i64 = 0xff;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    #[default]
    Autoregressive,
    Masked,
}

impl Objective {
    /// Tokens per raw sample needed to feed `n_ctx` tokens to the model.
    pub fn sample_len(self, n_ctx: usize) -> usize {
        match self {
            Objective::Autoregressive => n_ctx + 1,
            Objective::Masked         => n_ctx,
        }
    }

    pub fn is_causal(self) -> bool {
        matches!(self, Objective::Autoregressive)
    }
}

impl FromStr for Objective {
    type Err = TrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "autoregressive" | "ar" => Ok(Objective::Autoregressive),
            "masked" | "mlm"        => Ok(Objective::Masked),
            other => Err(TrainError::config(format!(
                "unknown objective '{other}' (expected autoregressive or masked)"
            ))),
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::Autoregressive => write!(f, "autoregressive"),
            Objective::Masked         => write!(f, "masked"),
        }
    }
}
