use burn::data::dataset::Dataset;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::objective::Objective;

/// One fixed-length window of byte tokens.
/// `visible` is only present for the masked objective: true = token
/// is shown to the model, false = token is hidden behind MASK_TOKEN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextSample {
    pub tokens:  Vec<u8>,
    pub visible: Option<Vec<bool>>,
}

impl TextSample {
    #[cfg(test)]
    pub fn hidden_count(&self) -> usize {
        self.visible
            .as_ref()
            .map_or(0, |v| v.iter().filter(|&&shown| !shown).count())
    }
}

/// Non-overlapping windows over a byte corpus. A trailing remainder
/// shorter than one window is dropped.
pub struct TextDataset {
    corpus:    Vec<u8>,
    window:    usize,
    objective: Objective,
    mask_prob: f64,
    seed:      u64,
}

impl TextDataset {
    pub fn new(corpus: Vec<u8>, n_ctx: usize, objective: Objective, mask_prob: f64, seed: u64) -> Self {
        Self {
            corpus,
            window: objective.sample_len(n_ctx),
            objective,
            mask_prob,
            seed,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Visibility mask for sample `index`, stable across epochs and workers.
    fn visibility(&self, index: usize) -> Vec<bool> {
        let mut rng = StdRng::seed_from_u64(self.seed ^ (index as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15));
        (0..self.window).map(|_| !rng.gen_bool(self.mask_prob)).collect()
    }
}

impl Dataset<TextSample> for TextDataset {
    fn get(&self, index: usize) -> Option<TextSample> {
        if index >= self.len() {
            return None;
        }
        let start  = index * self.window;
        let tokens = self.corpus[start..start + self.window].to_vec();
        let visible = match self.objective {
            Objective::Autoregressive => None,
            Objective::Masked         => Some(self.visibility(index)),
        };
        Some(TextSample { tokens, visible })
    }

    fn len(&self) -> usize {
        self.corpus.len() / self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autoregressive_windows() {
        let ds = TextDataset::new((0u8..20).collect(), 4, Objective::Autoregressive, 0.15, 0);
        // windows of n_ctx + 1 = 5 tokens
        assert_eq!(ds.len(), 4);
        let s = ds.get(1).unwrap();
        assert_eq!(s.tokens, vec![5, 6, 7, 8, 9]);
        assert!(s.visible.is_none());
        assert!(ds.get(4).is_none());
    }

    #[test]
    fn test_remainder_is_dropped() {
        let ds = TextDataset::new(vec![1; 11], 4, Objective::Masked, 0.5, 0);
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_masks_are_deterministic() {
        let corpus = vec![7u8; 64 * 8];
        let a = TextDataset::new(corpus.clone(), 64, Objective::Masked, 0.3, 42);
        let b = TextDataset::new(corpus, 64, Objective::Masked, 0.3, 42);
        for i in 0..a.len() {
            assert_eq!(a.get(i).unwrap().visible, b.get(i).unwrap().visible);
        }
        let hidden: usize = (0..a.len()).map(|i| a.get(i).unwrap().hidden_count()).sum();
        assert!(hidden > 0 && hidden < 64 * 8);
    }
}
