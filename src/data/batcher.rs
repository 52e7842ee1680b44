// ============================================================
// Layer 4 — Text Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<TextSample>
// into one RawRecord, the record shape delivered by the data
// loader before any objective-specific processing.
//
// How batching works here:
//   Input:  Vec of N TextSamples, each with S tokens
//   Output: RawRecord with text [N, S] (and mask [N, S] for the
//           masked objective)
//
//   Tokens are flattened row by row and reshaped:
//   [s1_t1, s1_t2, ..., s1_tS, s2_t1, ..., sN_tS] → [N, S]
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TextSample;

// ─── RawRecord ────────────────────────────────────────────────────────────────
/// A minibatch as it comes out of the data loader.
#[derive(Debug, Clone)]
pub struct RawRecord<B: Backend> {
    /// Token ids — shape: [batch, seq]
    pub text: Tensor<B, 2, Int>,

    /// Visibility mask — shape: [batch, seq], true = visible.
    /// Only present for the masked objective.
    pub mask: Option<Tensor<B, 2, Bool>>,
}

impl<B: Backend> RawRecord<B> {
    /// Build a record from plain rows. Rows must all have the same length.
    pub fn from_rows(rows: &[Vec<u8>], visible: Option<&[Vec<bool>]>, device: &B::Device) -> Self {
        let batch_size = rows.len();
        let seq_len    = rows.first().map_or(0, Vec::len);

        let flat: Vec<i32> = rows
            .iter()
            .flat_map(|r| r.iter().map(|&t| t as i32))
            .collect();
        let text = Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device)
            .reshape([batch_size, seq_len]);

        let mask = visible.map(|rows| {
            let flat: Vec<i32> = rows
                .iter()
                .flat_map(|r| r.iter().map(|&shown| shown as i32))
                .collect();
            Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device)
                .reshape([batch_size, seq_len])
                .equal_elem(1)
        });

        Self { text, mask }
    }
}

// ─── TextBatcher ──────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct TextBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> TextBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<TextSample, RawRecord<B>> for TextBatcher<B> {
    fn batch(&self, items: Vec<TextSample>) -> RawRecord<B> {
        let rows: Vec<Vec<u8>> = items.iter().map(|s| s.tokens.clone()).collect();

        // The dataset attaches masks to either all samples or none
        let visible: Option<Vec<Vec<bool>>> = items
            .iter()
            .map(|s| s.visible.clone())
            .collect();

        RawRecord::from_rows(&rows, visible.as_deref(), &self.device)
    }
}
