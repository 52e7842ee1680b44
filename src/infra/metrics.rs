// ============================================================
// Layer 6 — Metric Sinks
// ============================================================
// Two MetricSink implementations:
//
//   LogSink           one tracing line per optimizer step
//   CsvMetricsLogger  appends one CSV row per optimizer step
//
// Output file: <out-dir>/metrics.csv
//
// Example CSV output:
//   step,tokens,elapsed_time,train_loss,ms_per_step
//   0,2048,0.412000,5.561203,412.118000
//   1,4096,0.790000,5.402977,377.904000
//   ...
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::{state::StepMetrics, traits::MetricSink};

// ─── LogSink ──────────────────────────────────────────────────────────────────
/// Logs `[step=000012 t=4.1s tokens=00024576] loss=4.87 ms_per_step=330`.
#[derive(Debug, Default)]
pub struct LogSink;

impl MetricSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn record(&mut self, m: &StepMetrics) -> Result<()> {
        tracing::info!(
            "[step={:06} t={:.1}s tokens={:08}] loss={:2.2} ms_per_step={:.0}",
            m.step,
            m.elapsed_time,
            m.tokens,
            m.train_loss,
            m.ms_per_step,
        );
        Ok(())
    }
}

// ─── CsvMetricsLogger ─────────────────────────────────────────────────────────
pub struct CsvMetricsLogger {
    csv_path: PathBuf,
}

impl CsvMetricsLogger {
    /// Create the logger, writing the CSV header if the file is new.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");

        // Existing files are appended to, so runs can share one log
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "step,{}", StepMetrics::COLUMNS.join(","))?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

impl MetricSink for CsvMetricsLogger {
    fn name(&self) -> &str {
        "csv"
    }

    fn record(&mut self, m: &StepMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{},{:.6},{:.6},{:.6}",
            m.step, m.tokens, m.elapsed_time, m.train_loss, m.ms_per_step
        )?;
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(step: usize) -> StepMetrics {
        StepMetrics {
            step,
            tokens: 512 * (step as u64 + 1),
            elapsed_time: 0.5 * (step as f64 + 1.0),
            train_loss: 5.25,
            ms_per_step: 500.0,
        }
    }

    #[test]
    fn test_header_and_rows() {
        let dir        = tempfile::tempdir().unwrap();
        let mut logger = CsvMetricsLogger::new(dir.path()).unwrap();
        logger.record(&metrics(0)).unwrap();
        logger.record(&metrics(1)).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "step,tokens,elapsed_time,train_loss,ms_per_step");
        assert_eq!(lines[1], "0,512,0.500000,5.250000,500.000000");
        assert_eq!(lines[2], "1,1024,1.000000,5.250000,500.000000");
    }

    #[test]
    fn test_large_token_counts_are_written_exactly() {
        let dir        = tempfile::tempdir().unwrap();
        let mut logger = CsvMetricsLogger::new(dir.path()).unwrap();
        let tokens     = (1u64 << 53) + 1;
        logger.record(&StepMetrics { tokens, ..metrics(0) }).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let row  = text.lines().nth(1).unwrap();
        assert_eq!(row.split(',').nth(1).unwrap(), "9007199254740993");
    }

    #[test]
    fn test_existing_file_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        CsvMetricsLogger::new(dir.path()).unwrap().record(&metrics(0)).unwrap();
        CsvMetricsLogger::new(dir.path()).unwrap().record(&metrics(1)).unwrap();

        let text = fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_unwritable_path_is_an_error() {
        let dir        = tempfile::tempdir().unwrap();
        let mut logger = CsvMetricsLogger::new(dir.path()).unwrap();
        fs::remove_file(logger.csv_path()).unwrap();
        fs::create_dir(logger.csv_path()).unwrap();
        assert!(logger.record(&metrics(0)).is_err());
    }
}
