// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that define what a training run IS:
// its errors, its state, its stop conditions, its profiling
// schedule and the traits observers implement.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Error taxonomy shared by every layer
pub mod error;

// Objective selection (autoregressive / masked)
pub mod objective;

// Step → profiler action mapping
pub mod profile;

// Run-wide state, stop conditions and step metrics
pub mod state;

// MetricSink / TraceSink abstractions
pub mod traits;
