// Training pipeline — corpus in, persisted artifacts out.
//
// Stages run strictly in order:
// 1. Fit the label space and encode every article's labels
// 2. Seeded train/test split
// 3. Embed the train and test texts
// 4. Fit the one-vs-rest classifier on the train split
// 5. Train and test classification reports
// 6-7. Confusion matrices and curves on the test split
// 8. Persist classifier, label space and evaluation
//
// Any failure aborts the run before stage 8, so a failed run never replaces
// the artifacts of the previous successful one.

pub mod split;

use anyhow::{Context, Result};
use tracing::info;

use crate::artifacts::ArtifactStore;
use crate::classifier::{OneVsRestClassifier, SgdParams, TrainedModel};
use crate::config::Config;
use crate::corpus::Article;
use crate::embedding::traits::TextEmbedder;
use crate::evaluation::{EvaluationArtifacts, SplitOutcome};
use crate::labels::LabelSpace;

pub use split::{train_test_split, SplitError, SplitIndices};

#[derive(Debug, Clone, PartialEq)]
pub struct TrainerSettings {
    pub test_size: f64,
    /// Seeds both the split and the SGD shuffle.
    pub random_state: u64,
    /// `sgd.seed` is overridden by `random_state` at train time.
    pub sgd: SgdParams,
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_state: 42,
            sgd: SgdParams::default(),
        }
    }
}

impl From<&Config> for TrainerSettings {
    fn from(config: &Config) -> Self {
        Self {
            test_size: config.test_size,
            random_state: config.random_state,
            sgd: SgdParams::default(),
        }
    }
}

/// Runs the training pipeline against one embedder and artifact store.
pub struct Trainer<'a> {
    embedder: &'a dyn TextEmbedder,
    store: &'a ArtifactStore,
    settings: TrainerSettings,
}

impl<'a> Trainer<'a> {
    pub fn new(embedder: &'a dyn TextEmbedder, store: &'a ArtifactStore, settings: TrainerSettings) -> Self {
        Self {
            embedder,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &TrainerSettings {
        &self.settings
    }

    /// Train on `articles`, persist all artifacts, and return the evaluation.
    pub fn train(&self, articles: &[Article]) -> Result<EvaluationArtifacts> {
        if let Some(pos) = articles.iter().position(|a| !a.is_trainable()) {
            anyhow::bail!(
                "Article {} has no labels or blank text; filter the corpus before training",
                pos
            );
        }

        info!(articles = articles.len(), "Starting training run");

        let label_space = LabelSpace::fit(articles.iter().map(|a| &a.labels));
        let y = label_space
            .transform(articles.iter().map(|a| &a.labels))
            .context("Failed to encode labels")?;
        info!(classes = ?label_space.classes(), "Fitted label space");

        let split = train_test_split(
            articles.len(),
            self.settings.test_size,
            self.settings.random_state,
        )
        .context("Failed to split corpus")?;
        info!(
            train_rows = split.train.len(),
            test_rows = split.test.len(),
            "Split corpus"
        );

        let texts: Vec<String> = articles.iter().map(Article::text).collect();
        let y_train = split::take(&y, &split.train);
        let y_test = split::take(&y, &split.test);

        info!("Generating embeddings");
        let x_train = self.embed(&split::take(&texts, &split.train))?;
        let x_test = self.embed(&split::take(&texts, &split.test))?;

        info!("Fitting classifier");
        let sgd = self.sgd_params();
        let classifier =
            OneVsRestClassifier::fit(&x_train, &y_train, &sgd).context("Failed to fit classifier")?;

        info!("Evaluating");
        let pred_train = classifier.predict(&x_train)?;
        let pred_test = classifier.predict(&x_test)?;
        let prob_test = classifier.predict_proba(&x_test)?;

        let evaluation = EvaluationArtifacts::compute(
            label_space.classes(),
            SplitOutcome {
                truth: &y_train,
                predicted: &pred_train,
            },
            SplitOutcome {
                truth: &y_test,
                predicted: &pred_test,
            },
            &prob_test,
        );

        let model = TrainedModel {
            embedder: self.embedder.identity(),
            class_names: label_space.classes().to_vec(),
            classifier,
        };
        self.store
            .save_training_run(&model, &label_space, &evaluation)
            .context("Failed to persist training artifacts")?;

        info!(
            test_micro_f1 = evaluation.test_report.micro_avg.f1_score,
            "Training run complete"
        );
        Ok(evaluation)
    }

    /// SGD parameters for this run; the shuffle seed always follows `random_state`.
    fn sgd_params(&self) -> SgdParams {
        SgdParams {
            seed: self.settings.random_state,
            ..self.settings.sgd.clone()
        }
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        let identity = self.embedder.identity();
        let embeddings = self
            .embedder
            .embed(texts)
            .with_context(|| format!("Embedding failed ({identity})"))?;

        if embeddings.len() != texts.len() {
            anyhow::bail!(
                "Embedder returned {} vectors for {} texts",
                embeddings.len(),
                texts.len()
            );
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != identity.dimension) {
            anyhow::bail!(
                "Embedder returned a {}-dim vector, expected {}",
                bad.len(),
                identity.dimension
            );
        }
        Ok(embeddings)
    }
}
