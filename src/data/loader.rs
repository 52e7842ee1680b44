// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Loads raw training text from disk as bytes.
//
// The model is byte-level: every byte is one token, so the
// vocabulary is the 256 possible byte values and no tokenizer
// is needed. The loader accepts either:
//   - a single file, or
//   - a directory, in which case every regular file directly
//     inside it is read in sorted path order and concatenated
//
// Reference: Rust Book §12 (I/O and File Handling)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub struct CorpusLoader {
    path: PathBuf,
}

impl CorpusLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the whole corpus into memory.
    pub fn load(&self) -> Result<Vec<u8>> {
        let path = self.path.as_path();

        // A missing path is not fatal here; the training loop decides
        // whether an empty source violates the requested limits.
        if !path.exists() {
            tracing::warn!(
                "Data path '{}' does not exist, returning empty corpus",
                path.display()
            );
            return Ok(Vec::new());
        }

        if path.is_file() {
            let bytes = read_file(path)?;
            tracing::info!("Loaded {} bytes from '{}'", bytes.len(), path.display());
            return Ok(bytes);
        }

        let mut files: Vec<PathBuf> = fs::read_dir(path)
            .with_context(|| format!("Cannot read directory '{}'", path.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        let mut corpus = Vec::new();
        for file in &files {
            let bytes = read_file(file)?;
            tracing::debug!("Loaded: {} ({} bytes)", file.display(), bytes.len());
            corpus.extend_from_slice(&bytes);
        }

        tracing::info!(
            "Loaded {} bytes from {} files in '{}'",
            corpus.len(),
            files.len(),
            path.display()
        );
        Ok(corpus)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Cannot read '{}'", path.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_path_is_empty() {
        let dir    = tempfile::tempdir().unwrap();
        let loader = CorpusLoader::new(dir.path().join("nope"));
        assert!(loader.load().unwrap().is_empty());
    }

    #[test]
    fn test_directory_is_concatenated_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), b"world").unwrap();
        fs::write(dir.path().join("a.txt"), b"hello ").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let corpus = CorpusLoader::new(dir.path()).load().unwrap();
        assert_eq!(corpus, b"hello world");
    }

    #[test]
    fn test_single_file() {
        let dir  = tempfile::tempdir().unwrap();
        let file = dir.path().join("corpus.bin");
        fs::write(&file, [0u8, 1, 255]).unwrap();
        assert_eq!(CorpusLoader::new(&file).load().unwrap(), vec![0, 1, 255]);
    }
}
