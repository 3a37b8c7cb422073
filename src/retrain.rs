// Retraining — fold human corrections into the base corpus and retrain.
//
// Corrections share the base corpus schema. Rows are deduplicated on their
// raw (title, abstract) identity with the last occurrence winning, and
// corrections are appended after the base, so a correction always replaces the
// base row it duplicates. The corrections file is renamed once training has
// persisted new artifacts; a failed run leaves it in place for the next try.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use crate::config::Config;
use crate::corpus::{self, CorpusRow};
use crate::evaluation::EvaluationArtifacts;
use crate::training::Trainer;

/// Suffix appended to a consumed corrections file.
pub const CONSUMED_SUFFIX: &str = "processed";

/// Concatenate `base` and `corrections`, keeping the last row per
/// (title, abstract). Surviving rows stay in concatenation order.
pub fn merge_corpora(base: Vec<CorpusRow>, corrections: Vec<CorpusRow>) -> Vec<CorpusRow> {
    let rows: Vec<CorpusRow> = base.into_iter().chain(corrections).collect();

    let mut last: HashMap<(Option<&str>, Option<&str>), usize> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        last.insert((row.title.as_deref(), row.abstract_text.as_deref()), idx);
    }
    let keep: Vec<bool> = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| last.get(&(row.title.as_deref(), row.abstract_text.as_deref())) == Some(&idx))
        .collect();

    rows.into_iter()
        .zip(keep)
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect()
}

/// Where a consumed corrections file is moved.
///
/// `corrections.csv` becomes `corrections.csv.processed`; if that already
/// exists a UTC timestamp is added so earlier rounds are never overwritten.
pub fn consumed_path(corrections: &Path) -> PathBuf {
    let name = corrections
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "corrections".to_string());

    let plain = corrections.with_file_name(format!("{name}.{CONSUMED_SUFFIX}"));
    if !plain.exists() {
        return plain;
    }
    let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
    corrections.with_file_name(format!("{name}.{stamp}.{CONSUMED_SUFFIX}"))
}

#[derive(Debug)]
pub enum RetrainOutcome {
    /// Nothing to apply; training did not run.
    Skipped { reason: String },
    Retrained {
        base_rows: usize,
        correction_rows: usize,
        merged_rows: usize,
        consumed_to: PathBuf,
        evaluation: EvaluationArtifacts,
    },
}

pub struct Retrainer {
    base_path: PathBuf,
    corrections_path: PathBuf,
}

impl Retrainer {
    pub fn new(base_path: impl Into<PathBuf>, corrections_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            corrections_path: corrections_path.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.data_path, &config.corrections_path)
    }

    pub fn corrections_path(&self) -> &Path {
        &self.corrections_path
    }

    /// Merge, retrain and consume the corrections file.
    pub fn run(&self, trainer: &Trainer<'_>) -> Result<RetrainOutcome> {
        if !self.corrections_path.is_file() {
            info!(path = %self.corrections_path.display(), "No corrections file, skipping retrain");
            return Ok(RetrainOutcome::Skipped {
                reason: format!("no corrections file at {}", self.corrections_path.display()),
            });
        }

        let corrections = corpus::read_rows(&self.corrections_path)
            .context("Failed to read corrections")?;
        if corrections.is_empty() {
            info!(path = %self.corrections_path.display(), "Corrections file is empty, skipping retrain");
            return Ok(RetrainOutcome::Skipped {
                reason: format!("{} has no rows", self.corrections_path.display()),
            });
        }

        let base = corpus::read_rows(&self.base_path).context("Failed to read base corpus")?;
        let base_rows = base.len();
        let correction_rows = corrections.len();

        let merged = merge_corpora(base, corrections);
        let merged_rows = merged.len();
        info!(base_rows, correction_rows, merged_rows, "Merged corrections into corpus");

        let articles = corpus::articles_from_rows(merged);
        let evaluation = trainer.train(&articles).context("Retraining failed")?;

        let consumed_to = consumed_path(&self.corrections_path);
        std::fs::rename(&self.corrections_path, &consumed_to).with_context(|| {
            format!(
                "Retrained, but failed to move {} to {}",
                self.corrections_path.display(),
                consumed_to.display()
            )
        })?;
        info!(to = %consumed_to.display(), "Marked corrections consumed");

        Ok(RetrainOutcome::Retrained {
            base_rows,
            correction_rows,
            merged_rows,
            consumed_to,
            evaluation,
        })
    }
}
