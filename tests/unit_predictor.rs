// Unit tests for the predictor.
//
// `select_labels` is pure and tested directly. The NotReady paths build a
// predictor against missing or mismatched artifacts and check that it never
// fabricates a result.

mod common;

use std::cell::Cell;

use common::{synthetic_articles, KeywordEmbedder};
use medtag::artifacts::{ArtifactKind, ArtifactStore};
use medtag::corpus::Article;
use medtag::embedding::traits::TextEmbedder;
use medtag::labels::LabelSpace;
use medtag::predictor::{select_labels, PredictError, Predictor, PredictorSettings};
use medtag::training::{Trainer, TrainerSettings};

fn abc() -> LabelSpace {
    LabelSpace::from_classes(vec!["A".into(), "B".into(), "C".into()]).unwrap()
}

fn keyword_loader() -> anyhow::Result<Box<dyn TextEmbedder>> {
    Ok(Box::new(KeywordEmbedder::default()))
}

fn trained_store() -> (tempfile::TempDir, ArtifactStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let embedder = KeywordEmbedder::default();
    Trainer::new(&embedder, &store, TrainerSettings::default())
        .train(&synthetic_articles(40))
        .unwrap();
    (dir, store)
}

// ============================================================
// select_labels
// ============================================================

#[test]
fn labels_above_threshold_with_aligned_confidences() {
    let result = select_labels(&[0.2, 0.6, 0.9], &abc(), &PredictorSettings::default());
    assert_eq!(result.labels, vec!["B", "C"]);
    assert_eq!(result.confidences, vec![0.6, 0.9]);
    assert!(result.is_low_confidence);
}

#[test]
fn confidences_match_labels_in_length() {
    for probs in [[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [0.51, 0.49, 0.99]] {
        let result = select_labels(&probs, &abc(), &PredictorSettings::default());
        assert_eq!(result.labels.len(), result.confidences.len());
        assert!(result.confidences.iter().all(|&p| p > 0.5));
    }
}

#[test]
fn low_confidence_iff_some_probability_in_band() {
    let cases = [
        ([0.1, 0.2, 0.9], false),
        ([0.31, 0.0, 0.0], true),
        ([0.0, 0.69, 1.0], true),
        ([0.3, 0.7, 0.0], false),
        ([0.0, 0.0, 0.5], true),
    ];
    for (probs, expected) in cases {
        let result = select_labels(&probs, &abc(), &PredictorSettings::default());
        assert_eq!(result.is_low_confidence, expected, "probs {probs:?}");
    }
}

#[test]
fn empty_selection_is_valid() {
    let result = select_labels(&[0.1, 0.1, 0.1], &abc(), &PredictorSettings::default());
    assert!(result.labels.is_empty());
    assert!(!result.is_low_confidence);
}

#[test]
fn result_serializes_with_expected_fields() {
    let result = select_labels(&[0.2, 0.6, 0.9], &abc(), &PredictorSettings::default());
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["labels"], serde_json::json!(["B", "C"]));
    assert_eq!(json["is_low_confidence"], true);
}

// ============================================================
// NotReady
// ============================================================

#[test]
fn missing_artifacts_leave_predictor_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let loader_called = Cell::new(false);

    let predictor = Predictor::load(&store, PredictorSettings::default(), || {
        loader_called.set(true);
        keyword_loader()
    });

    assert!(!predictor.is_ready());
    assert!(!loader_called.get(), "embedder must not load without artifacts");
    assert!(predictor.not_ready_reason().unwrap().contains("medtag train"));

    let err = predictor.predict("Heart failure", "").unwrap_err();
    assert!(matches!(err, PredictError::NotReady { .. }));
    assert!(err.to_string().starts_with("Predictor not initialized"));
}

#[test]
fn mismatched_embedder_is_refused() {
    let (_dir, store) = trained_store();
    let predictor = Predictor::load(&store, PredictorSettings::default(), || -> anyhow::Result<Box<dyn TextEmbedder>> {
        Ok(Box::new(KeywordEmbedder {
            model: "some-other-model".to_string(),
        }))
    });
    assert!(!predictor.is_ready());
    assert!(predictor.not_ready_reason().unwrap().contains("some-other-model"));
}

#[test]
fn classifier_from_another_run_is_refused() {
    let (_dir_a, store_a) = trained_store();

    // Same class count, different names.
    let renamed: Vec<Article> = synthetic_articles(40)
        .into_iter()
        .map(|article| Article {
            labels: article.labels.iter().map(|l| format!("topic-{l}")).collect(),
            ..article
        })
        .collect();
    let dir_b = tempfile::tempdir().unwrap();
    let store_b = ArtifactStore::new(dir_b.path());
    let embedder = KeywordEmbedder::default();
    Trainer::new(&embedder, &store_b, TrainerSettings::default())
        .train(&renamed)
        .unwrap();

    std::fs::copy(
        store_b.path(ArtifactKind::Classifier),
        store_a.path(ArtifactKind::Classifier),
    )
    .unwrap();

    let predictor = Predictor::load(&store_a, PredictorSettings::default(), keyword_loader);
    assert!(!predictor.is_ready());
    assert!(predictor
        .not_ready_reason()
        .unwrap()
        .contains("different training runs"));
    let err = predictor.predict("Tumor response", "").unwrap_err();
    assert!(matches!(err, PredictError::NotReady { .. }));
}

#[test]
fn embedder_load_failure_is_not_ready() {
    let (_dir, store) = trained_store();
    let predictor = Predictor::load(&store, PredictorSettings::default(), || {
        anyhow::bail!("model.onnx missing")
    });
    assert!(!predictor.is_ready());
    assert!(predictor.not_ready_reason().unwrap().contains("model.onnx missing"));
}

#[test]
fn ready_predictor_labels_an_article() {
    let (_dir, store) = trained_store();
    let predictor = Predictor::load(&store, PredictorSettings::default(), keyword_loader);
    assert!(predictor.is_ready());
    assert!(predictor.not_ready_reason().is_none());

    let result = predictor
        .predict("Brain atrophy", "Cortical changes in the brain")
        .unwrap();
    assert_eq!(result.labels, vec!["neurological"]);
}
