// ============================================================
// Layer 5 — Compute Device Selection
// ============================================================
// Resolves the `--device` flag to one of the burn backends this
// binary was compiled with:
//
//   cpu   → Autodiff<NdArray>   (always available)
//   wgpu  → Autodiff<Wgpu>      (cargo feature `wgpu`)
//
// Anything else (cuda, or wgpu without the feature) is a
// TrainError::Device raised before the model is built.
//
// Reference: Burn Book §2 (Backends)

use std::{fmt, str::FromStr};

use crate::domain::error::TrainError;

pub type CpuBackend = burn::backend::Autodiff<burn::backend::NdArray>;

#[cfg(feature = "wgpu")]
pub type WgpuBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDevice {
    Cpu,
    #[cfg(feature = "wgpu")]
    Wgpu,
}

impl FromStr for ComputeDevice {
    type Err = TrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            #[cfg(feature = "wgpu")]
            "wgpu" | "gpu" => Ok(Self::Wgpu),
            #[cfg(not(feature = "wgpu"))]
            "wgpu" | "gpu" => Err(TrainError::Device(
                "wgpu support was not compiled in (rebuild with --features wgpu)".into(),
            )),
            other => Err(TrainError::Device(format!(
                "'{other}' is not available in this build"
            ))),
        }
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            #[cfg(feature = "wgpu")]
            Self::Wgpu => f.write_str("wgpu"),
        }
    }
}
