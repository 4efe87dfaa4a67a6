//! Corpus loading from JSON Lines files or text directories

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::{DomainError, Passage};

const TEXT_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Builds the passage list served by the in-memory retriever.
///
/// Accepted inputs:
/// - a `.jsonl` file with one `{"text": ..., "source_metadata": {...}}` object per line
/// - a `.txt`/`.md` file, loaded as one passage
/// - a directory, searched recursively for `.txt`/`.md` files, one passage per file
#[derive(Debug, Default, Clone, Copy)]
pub struct CorpusLoader;

impl CorpusLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<Vec<Passage>, DomainError> {
        let path = path.as_ref();

        let passages = if path.is_dir() {
            self.load_directory(path)?
        } else if has_extension(path, &["jsonl"]) {
            self.load_jsonl(path)?
        } else if has_extension(path, &TEXT_EXTENSIONS) {
            self.load_text_file(path)?.into_iter().collect()
        } else if !path.exists() {
            return Err(DomainError::configuration(format!(
                "Corpus not found: {}",
                path.display()
            )));
        } else {
            return Err(DomainError::configuration(format!(
                "Unsupported corpus format: {} (expected .jsonl, .txt, .md or a directory)",
                path.display()
            )));
        };

        info!(path = %path.display(), passages = passages.len(), "Corpus loaded");
        Ok(passages)
    }

    fn load_jsonl(&self, path: &Path) -> Result<Vec<Passage>, DomainError> {
        let raw = read(path)?;
        let mut passages = Vec::new();

        for (index, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let passage: Passage = serde_json::from_str(line).map_err(|e| {
                DomainError::configuration(format!(
                    "{}:{}: invalid passage: {}",
                    path.display(),
                    index + 1,
                    e
                ))
            })?;

            if passage.text.trim().is_empty() {
                warn!(path = %path.display(), line = index + 1, "Skipping empty passage");
                continue;
            }

            passages.push(passage);
        }

        Ok(passages)
    }

    fn load_directory(&self, dir: &Path) -> Result<Vec<Passage>, DomainError> {
        let mut files = Vec::new();
        collect_text_files(dir, &mut files)?;
        files.sort();

        let mut passages = Vec::with_capacity(files.len());
        for file in files {
            if let Some(passage) = self.load_text_file(&file)? {
                passages.push(passage);
            }
        }

        Ok(passages)
    }

    fn load_text_file(&self, path: &Path) -> Result<Option<Passage>, DomainError> {
        let text = read(path)?;
        if text.trim().is_empty() {
            warn!(path = %path.display(), "Skipping empty file");
            return Ok(None);
        }

        Ok(Some(Passage::new(text.trim()).with_metadata(
            "source",
            serde_json::json!(path.display().to_string()),
        )))
    }
}

fn read(path: &Path) -> Result<String, DomainError> {
    fs::read_to_string(path).map_err(|e| {
        DomainError::configuration(format!("Failed to read {}: {}", path.display(), e))
    })
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

fn collect_text_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), DomainError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        DomainError::configuration(format!("Failed to list {}: {}", dir.display(), e))
    })?;

    for entry in entries {
        let path = entry
            .map_err(|e| DomainError::configuration(format!("Failed to list {}: {}", dir.display(), e)))?
            .path();

        if path.is_dir() {
            collect_text_files(&path, out)?;
        } else if has_extension(&path, &TEXT_EXTENSIONS) {
            out.push(path);
        }
    }

    Ok(())
}
