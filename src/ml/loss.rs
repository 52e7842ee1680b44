// ============================================================
// Layer 5 — Loss Functions
// ============================================================
// Scalar training losses over the logits of one Record.
//
//   Autoregressive  target = text[:, 1..]
//                   mean cross-entropy over every position
//
//   Masked          target = text (the uncorrupted tokens)
//                   per-token cross-entropy × (1 - mask),
//                   mean over ALL positions, visible ones
//                   included as zeros
//
// The masked mean keeps visible positions in the denominator,
// so its magnitude follows the hidden:visible ratio of each
// batch. Keep it that way: the effective learning rate of
// existing runs depends on it.
//
// Cross-entropy goes through log_softmax, which subtracts the
// row max before exponentiating.
//
// Reference: Burn Book §5 (Training), Devlin et al. (2019) BERT

use burn::{prelude::*, tensor::activation::log_softmax};

use crate::data::processor::Record;
use crate::domain::{error::TrainError, objective::Objective};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossFunction {
    Autoregressive { n_vocab: usize },
    Masked { n_vocab: usize },
}

impl LossFunction {
    pub fn new(objective: Objective, n_vocab: usize) -> Self {
        match objective {
            Objective::Autoregressive => LossFunction::Autoregressive { n_vocab },
            Objective::Masked         => LossFunction::Masked { n_vocab },
        }
    }

    fn n_vocab(&self) -> usize {
        match *self {
            LossFunction::Autoregressive { n_vocab } | LossFunction::Masked { n_vocab } => n_vocab,
        }
    }

    /// logits: [batch, seq, n_vocab] → loss: [1]
    pub fn compute<B: Backend>(
        &self,
        logits: Tensor<B, 3>,
        record: &Record<B>,
    ) -> Result<Tensor<B, 1>, TrainError> {
        let [_, _, classes] = logits.dims();
        if classes != self.n_vocab() {
            return Err(TrainError::shape(format!(
                "logits have {classes} classes, expected n_vocab = {}",
                self.n_vocab()
            )));
        }

        match self {
            LossFunction::Autoregressive { .. } => {
                let [batch, len] = record.text.dims();
                let targets = record.text.clone().slice([0..batch, 1..len]);
                Ok(token_cross_entropy(logits, targets)?.mean())
            }
            LossFunction::Masked { .. } => {
                let mask = record
                    .mask
                    .clone()
                    .ok_or_else(|| TrainError::shape("masked loss needs the record's 'mask' field"))?;
                let per_token = token_cross_entropy(logits, record.text.clone())?;
                if per_token.dims() != mask.dims() {
                    return Err(TrainError::shape(format!(
                        "mask shape {:?} does not match loss shape {:?}",
                        mask.dims(),
                        per_token.dims()
                    )));
                }
                let hidden = mask.bool_not().float();
                Ok((per_token * hidden).mean())
            }
        }
    }
}

/// Unreduced cross-entropy: logits [b, s, v], targets [b, s] → [b, s]
fn token_cross_entropy<B: Backend>(
    logits: Tensor<B, 3>,
    targets: Tensor<B, 2, Int>,
) -> Result<Tensor<B, 2>, TrainError> {
    let [batch, seq, _] = logits.dims();
    if targets.dims() != [batch, seq] {
        return Err(TrainError::shape(format!(
            "logits cover {batch}x{seq} positions but targets are {:?}",
            targets.dims()
        )));
    }

    let log_probs = log_softmax(logits, 2);
    let picked    = log_probs.gather(2, targets.unsqueeze_dim::<3>(2));
    Ok(picked.reshape([batch, seq]).neg())
}
