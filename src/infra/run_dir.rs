// ============================================================
// Layer 6 — Run Directory
// ============================================================
// Owns the output directory of one training run:
//
//   <out-dir>/
//     train_config.json          ← resolved TrainConfig
//     metrics.csv                ← CsvMetricsLogger
//     profile/step_<n>.trace.json ← ChromeTraceWriter
//
// Model weights are not written: runs cannot be resumed.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;

pub struct RunDirectory {
    dir: PathBuf,
}

impl RunDirectory {
    /// Create the directory (and parents) if it does not exist yet.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create run directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn profile_dir(&self) -> PathBuf {
        self.dir.join("profile")
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    #[cfg(test)]
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}
