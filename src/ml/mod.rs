// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Model, loss and the training loop itself.
//
//   backend.rs       — maps `--device` to a compiled-in burn
//                      backend (NdArray, optionally Wgpu)
//
//   model.rs         — decoder-style Transformer:
//                      • Token embeddings
//                      • Optional positional encoding
//                        (none / sinusoidal / learned)
//                      • Multi-head self-attention, causal
//                        for the autoregressive objective
//                      • GELU feed-forward networks
//                      • Pre-norm residual blocks
//                      • Unembedding to vocabulary logits
//
//   loss.rs          — LossFunction (autoregressive / masked
//                      cross-entropy)
//
//   training_loop.rs — gradient accumulation, optimizer steps,
//                      stop conditions, metric emission
//
//   trainer.rs       — assembles model, optimizer, data stream,
//                      sinks and profiler for one run
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

/// Compute device resolution
pub mod backend;

/// Transformer sequence model
pub mod model;

/// Objective-specific cross-entropy
pub mod loss;

/// Optimizer-step loop with gradient accumulation
pub mod training_loop;

/// Wires one training run together
pub mod trainer;
