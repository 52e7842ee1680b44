// ============================================================
// Layer 4 — Batch Processors
// ============================================================
// Turns RawRecords from the loader into model-ready Records on
// the training device. The variant is chosen once per run from
// the Objective:
//
//   Autoregressive  input = text[:, 0..len-1]
//                   (the last token has nothing to predict)
//
//   Masked          input[i] = text[i]     where mask[i]
//                   input[i] = MASK_TOKEN  elsewhere
//
// `stream()` wraps any RawRecord iterator lazily. The wrapper
// is pull-based and inherits the source's length: it yields
// `None` exactly when the source does and cannot be restarted.

use burn::prelude::*;

use crate::data::batcher::RawRecord;
use crate::domain::{
    error::TrainError,
    objective::{Objective, MASK_TOKEN},
};

/// A processed minibatch: the raw fields plus the model `input`.
#[derive(Debug, Clone)]
pub struct Record<B: Backend> {
    pub text:  Tensor<B, 2, Int>,
    pub mask:  Option<Tensor<B, 2, Bool>>,
    /// What the model sees — shape [batch, seq']
    pub input: Tensor<B, 2, Int>,
}

impl<B: Backend> Record<B> {
    /// Tokens this record contributes to the run's token counter.
    pub fn num_tokens(&self) -> usize {
        let [batch, seq] = self.input.dims();
        batch * seq
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchProcessor {
    Autoregressive,
    Masked,
}

impl From<Objective> for BatchProcessor {
    fn from(objective: Objective) -> Self {
        match objective {
            Objective::Autoregressive => BatchProcessor::Autoregressive,
            Objective::Masked         => BatchProcessor::Masked,
        }
    }
}

impl BatchProcessor {
    pub fn process<B: Backend>(
        &self,
        raw: RawRecord<B>,
        device: &B::Device,
    ) -> Result<Record<B>, TrainError> {
        let text = raw.text.to_device(device);

        match self {
            BatchProcessor::Autoregressive => {
                let [batch, len] = text.dims();
                if len < 2 {
                    return Err(TrainError::shape(format!(
                        "autoregressive records need at least 2 tokens, got {len}"
                    )));
                }
                let input = text.clone().slice([0..batch, 0..len - 1]);
                Ok(Record { text, mask: raw.mask.map(|m| m.to_device(device)), input })
            }
            BatchProcessor::Masked => {
                let mask = raw
                    .mask
                    .ok_or_else(|| TrainError::shape("masked records need a 'mask' field"))?
                    .to_device(device);
                if mask.dims() != text.dims() {
                    return Err(TrainError::shape(format!(
                        "mask shape {:?} does not match text shape {:?}",
                        mask.dims(),
                        text.dims()
                    )));
                }
                let input = text.clone().mask_fill(mask.clone().bool_not(), MASK_TOKEN);
                Ok(Record { text, mask: Some(mask), input })
            }
        }
    }

    /// Lazily apply this processor to every record of `source`.
    pub fn stream<B, I>(self, source: I, device: B::Device) -> ProcessedRecords<B, I>
    where
        B: Backend,
        I: Iterator<Item = RawRecord<B>>,
    {
        ProcessedRecords { source, processor: self, device }
    }
}

pub struct ProcessedRecords<B: Backend, I> {
    source:    I,
    processor: BatchProcessor,
    device:    B::Device,
}

impl<B, I> Iterator for ProcessedRecords<B, I>
where
    B: Backend,
    I: Iterator<Item = RawRecord<B>>,
{
    type Item = Result<Record<B>, TrainError>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.source.next()?;
        Some(self.processor.process(raw, &self.device))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn ints(t: Tensor<TestBackend, 2, Int>) -> Vec<i64> {
        t.into_data().iter::<i64>().collect()
    }

    #[test]
    fn test_autoregressive_drops_last_token() {
        let device = Default::default();
        let raw    = RawRecord::<TestBackend>::from_rows(&[vec![10, 11, 12, 13], vec![20, 21, 22, 23]], None, &device);

        let record = BatchProcessor::Autoregressive.process(raw, &device).unwrap();
        assert_eq!(record.input.dims(), [2, 3]);
        assert_eq!(ints(record.input.clone()), vec![10, 11, 12, 20, 21, 22]);
        assert_eq!(record.num_tokens(), 6);
        // text is kept whole for the loss
        assert_eq!(record.text.dims(), [2, 4]);
    }

    #[test]
    fn test_autoregressive_rejects_single_token() {
        let device = Default::default();
        let raw    = RawRecord::<TestBackend>::from_rows(&[vec![1]], None, &device);
        let err    = BatchProcessor::Autoregressive.process(raw, &device).unwrap_err();
        assert!(matches!(err, TrainError::Shape(_)));
    }

    #[test]
    fn test_masked_substitutes_hidden_positions() {
        let device  = Default::default();
        let rows    = vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]];
        let visible = vec![vec![true, false, true, false], vec![false, false, true, true]];
        let raw     = RawRecord::<TestBackend>::from_rows(&rows, Some(visible.as_slice()), &device);

        let record = BatchProcessor::Masked.process(raw, &device).unwrap();
        let input  = ints(record.input);
        let flat_rows: Vec<i64>   = rows.concat().into_iter().map(i64::from).collect();
        let flat_visible: Vec<bool> = visible.concat();

        for i in 0..input.len() {
            if flat_visible[i] {
                assert_eq!(input[i], flat_rows[i]);
            } else {
                assert_eq!(input[i], MASK_TOKEN);
            }
        }
    }

    #[test]
    fn test_masked_shape_mismatch() {
        let device = Default::default();
        let text   = RawRecord::<TestBackend>::from_rows(&[vec![1, 2, 3]], None, &device).text;
        let mask   = RawRecord::<TestBackend>::from_rows(&[vec![1, 2]], Some(&[vec![true, false]][..]), &device).mask;

        let err = BatchProcessor::Masked
            .process(RawRecord { text, mask }, &device)
            .unwrap_err();
        assert!(matches!(err, TrainError::Shape(_)));
    }

    #[test]
    fn test_stream_is_lazy_and_ends_with_source() {
        let device  = Default::default();
        let records = (0..3u8).map(|i| RawRecord::<TestBackend>::from_rows(&[vec![i, i + 1]], None, &device));

        let mut stream = BatchProcessor::Autoregressive.stream(records, device.clone());
        assert!(stream.next().unwrap().is_ok());
        assert_eq!(stream.by_ref().count(), 2);
        assert!(stream.next().is_none());
    }
}
