// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from bytes on disk to model-ready records.
//
//   corpus files
//       │
//       ▼
//   CorpusLoader      → reads files, one byte = one token
//       │
//       ▼
//   TextDataset       → fixed windows (+ masks), Burn Dataset
//       │
//       ▼
//   TextBatcher       → stacks windows into RawRecord tensors
//       │
//       ▼
//   DataLoader        → Burn loader, one prefetch worker
//       │
//       ▼
//   BatchProcessor    → adds the objective-specific `input`
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Reads raw byte corpora from a file or directory
pub mod loader;

/// Implements Burn's Dataset trait over a byte corpus
pub mod dataset;

/// Implements Burn's Batcher trait to create RawRecords
pub mod batcher;

/// Autoregressive / masked record processing
pub mod processor;
