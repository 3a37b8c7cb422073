// Sentence embeddings with all-MiniLM-L6-v2 running locally via ONNX.
//
// Reproduces the sentence-transformers pipeline for this model: word-piece
// tokenization truncated to 256 tokens, a BERT forward pass, mean pooling of
// the last hidden state weighted by the attention mask, then L2 normalisation.
// Texts are processed in batches of 32 so a full corpus never has to be
// padded into one giant tensor.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

use super::traits::{EmbedderIdentity, Embedding, TextEmbedder};

/// Model name recorded as the embedder identity.
pub const MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Embedding dimension for all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

/// Maximum sequence length the model was trained with.
pub const MAX_SEQ_LEN: usize = 256;

/// Texts per forward pass.
pub const BATCH_SIZE: usize = 32;

/// Sentence embedder using a local ONNX model.
///
/// `ort::Session::run` takes `&mut self`, so the session sits behind a Mutex;
/// that also keeps the embedder `Sync` for shared read-only use by a serving
/// layer.
pub struct SentenceEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    show_progress: bool,
}

impl SentenceEmbedder {
    /// Load the sentence embedding model and tokenizer from the given directory.
    ///
    /// Expects `model.onnx` and `tokenizer.json` in the directory.
    /// Run `medtag download-model` first if they don't exist.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            anyhow::bail!(
                "Embedding model not found: {}\nRun `medtag download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Embedding tokenizer not found: {}\nRun `medtag download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| {
                format!(
                    "Failed to load embedding model from {}",
                    model_path.display()
                )
            })?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load embedding tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure tokenizer truncation: {}", e))?;

        debug!(
            "Loaded sentence embedding model from {}",
            model_dir.display()
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            show_progress: false,
        })
    }

    /// Show a progress bar while embedding large batches.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Tokenize, run inference and pool a single batch.
    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let encodings: Vec<_> = texts
            .iter()
            .map(|t| {
                self.tokenizer
                    .encode(t.as_str(), true)
                    .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let batch_size = encodings.len();
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        if max_len == 0 {
            return Ok(vec![vec![0.0; EMBEDDING_DIM]; batch_size]);
        }

        // BERT inputs, padded to the longest sequence in the batch:
        //   input_ids: token IDs (pad with 0)
        //   attention_mask: 1 for real tokens, 0 for padding
        //   token_type_ids: all zeros for single-sentence input
        let mut input_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut attention_mask_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut token_type_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);

        for enc in &encodings {
            let ids = enc.get_ids();
            let mask = enc.get_attention_mask();
            let seq_len = ids.len();
            let pad_len = max_len - seq_len;

            input_ids_flat.extend(ids.iter().map(|&id| id as i64));
            input_ids_flat.extend(std::iter::repeat_n(0i64, pad_len));
            attention_mask_flat.extend(mask.iter().map(|&m| m as i64));
            attention_mask_flat.extend(std::iter::repeat_n(0i64, pad_len));
            token_type_ids_flat.extend(std::iter::repeat_n(0i64, max_len));
        }

        let shape = [batch_size as i64, max_len as i64];

        let input_ids_tensor = Tensor::from_array((shape, input_ids_flat))
            .context("Failed to create input_ids tensor")?;
        let attention_mask_tensor = Tensor::from_array((shape, attention_mask_flat.clone()))
            .context("Failed to create attention_mask tensor")?;
        let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids_flat))
            .context("Failed to create token_type_ids tensor")?;

        // last_hidden_state: [batch, seq_len, 384]
        let hidden_states = {
            let mut session = self
                .session
                .lock()
                .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

            let outputs = session
                .run(ort::inputs! {
                    "input_ids" => input_ids_tensor,
                    "attention_mask" => attention_mask_tensor,
                    "token_type_ids" => token_type_ids_tensor
                })
                .context("Embedding ONNX inference failed")?;

            let (_shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .context("Failed to extract embedding output tensor")?;

            data.to_vec()
        };

        let expected = batch_size * max_len * EMBEDDING_DIM;
        if hidden_states.len() != expected {
            anyhow::bail!(
                "Embedding model returned {} values, expected {} ({} x {} x {})",
                hidden_states.len(),
                expected,
                batch_size,
                max_len,
                EMBEDDING_DIM
            );
        }

        Ok((0..batch_size)
            .map(|i| {
                let mask = &attention_mask_flat[i * max_len..(i + 1) * max_len];
                let hidden = &hidden_states[i * max_len * EMBEDDING_DIM..(i + 1) * max_len * EMBEDDING_DIM];
                let mut pooled = mean_pool(hidden, mask);
                l2_normalize(&mut pooled);
                pooled
            })
            .collect())
    }
}

impl TextEmbedder for SentenceEmbedder {
    fn identity(&self) -> EmbedderIdentity {
        EmbedderIdentity {
            model: MODEL_NAME.to_string(),
            dimension: EMBEDDING_DIM,
        }
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let pb = self.show_progress.then(|| {
            let pb = ProgressBar::new(texts.len() as u64);
            if let Ok(style) =
                ProgressStyle::default_bar().template("    [{bar:40.cyan/blue}] {pos}/{len} texts ({eta})")
            {
                pb.set_style(style.progress_chars("=> "));
            }
            pb
        });

        let mut embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            embeddings.extend(self.embed_chunk(chunk)?);
            if let Some(ref pb) = pb {
                pb.inc(chunk.len() as u64);
            }
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        debug!(
            texts = texts.len(),
            dim = EMBEDDING_DIM,
            "Computed sentence embeddings"
        );

        Ok(embeddings)
    }
}

/// Average token embeddings weighted by the attention mask.
///
/// `hidden` is `[seq_len, dim]` flattened row-major; `mask` has `seq_len`
/// entries.
fn mean_pool(hidden: &[f32], mask: &[i64]) -> Embedding {
    let dim = if mask.is_empty() { 0 } else { hidden.len() / mask.len() };
    let mut sum = vec![0.0_f64; dim];
    let mut mask_sum = 0.0_f64;

    for (j, &m) in mask.iter().enumerate() {
        if m > 0 {
            let m = m as f64;
            mask_sum += m;
            for (k, acc) in sum.iter_mut().enumerate() {
                *acc += hidden[j * dim + k] as f64 * m;
            }
        }
    }

    if mask_sum > 0.0 {
        for val in &mut sum {
            *val /= mask_sum;
        }
    }
    sum
}

/// Scale to unit length. Zero vectors are left unchanged.
fn l2_normalize(v: &mut [f64]) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > f64::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool_ignores_padding() {
        // Two tokens of dim 2, second is padding.
        let hidden = [1.0_f32, 3.0, 100.0, 100.0];
        let pooled = mean_pool(&hidden, &[1, 0]);
        assert_eq!(pooled, vec![1.0, 3.0]);
    }

    #[test]
    fn test_mean_pool_averages_real_tokens() {
        let hidden = [1.0_f32, 0.0, 3.0, 2.0];
        let pooled = mean_pool(&hidden, &[1, 1]);
        assert!((pooled[0] - 2.0).abs() < 1e-12);
        assert!((pooled[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean_pool_all_masked_is_zero() {
        let pooled = mean_pool(&[5.0_f32, 5.0], &[0]);
        assert_eq!(pooled, vec![0.0, 0.0]);
    }

    #[test]
    fn test_l2_normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-12);
        assert!((v[1] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_l2_normalize_zero_vector_unchanged() {
        let mut v = vec![0.0; 4];
        l2_normalize(&mut v);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_load_missing_model_mentions_download() {
        let dir = tempfile::tempdir().unwrap();
        let err = SentenceEmbedder::load(dir.path()).err().unwrap();
        assert!(err.to_string().contains("download-model"));
    }
}
