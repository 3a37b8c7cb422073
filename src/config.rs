use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::embedding::download;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. Every
/// setting has a default, so `medtag` runs from a fresh checkout.
pub struct Config {
    /// Base corpus (`;`-delimited title;abstract;group).
    pub data_path: PathBuf,
    /// Human corrections, same schema as the base corpus.
    pub corrections_path: PathBuf,
    /// Directory holding classifier.json, label_space.json and evaluation.json.
    pub artifacts_dir: PathBuf,
    /// Directory containing the ONNX model files
    pub model_dir: PathBuf,
    /// Fraction of the corpus held out for evaluation
    pub test_size: f64,
    /// Seed for the split and the SGD shuffle
    pub random_state: u64,
    /// Minimum probability for a label to be returned by the predictor
    pub prediction_threshold: f64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let model_dir = env::var("MEDTAG_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| download::default_model_dir());

        let test_size: f64 = parse_var("MEDTAG_TEST_SIZE", 0.2)?;
        if !(test_size > 0.0 && test_size < 1.0) {
            anyhow::bail!("MEDTAG_TEST_SIZE must be between 0 and 1 (exclusive), got {test_size}");
        }

        let prediction_threshold: f64 = parse_var("MEDTAG_PREDICTION_THRESHOLD", 0.5)?;
        if !(0.0..=1.0).contains(&prediction_threshold) {
            anyhow::bail!(
                "MEDTAG_PREDICTION_THRESHOLD must be between 0 and 1, got {prediction_threshold}"
            );
        }

        Ok(Self {
            data_path: path_var("MEDTAG_DATA_PATH", "./data/articles.csv"),
            corrections_path: path_var("MEDTAG_CORRECTIONS_PATH", "./data/corrections.csv"),
            artifacts_dir: path_var("MEDTAG_ARTIFACTS_DIR", "./artifacts"),
            model_dir,
            test_size,
            random_state: parse_var("MEDTAG_RANDOM_STATE", 42)?,
            prediction_threshold,
        })
    }

    /// Where the sentence embedding model lives.
    pub fn embedding_model_dir(&self) -> PathBuf {
        download::embedding_model_dir(&self.model_dir)
    }

    /// Check that the embedding model has been downloaded.
    /// Call this before any operation that embeds text.
    pub fn require_embedder(&self) -> Result<()> {
        if !download::embedding_files_present(&self.model_dir) {
            anyhow::bail!(
                "Embedding model files not found in {}\n\
                 Run `medtag download-model` to download them.",
                self.embedding_model_dir().display()
            );
        }
        Ok(())
    }
}

fn path_var(name: &str, default: &str) -> PathBuf {
    env::var(name)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} is not a valid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}
