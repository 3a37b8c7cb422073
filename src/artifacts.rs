// Artifact store — the three persisted units of a training run.
//
// classifier.json   the fitted one-vs-rest models + embedder identity
// label_space.json  the canonical class ordering
// evaluation.json   reports, confusion matrices, curves, class names
//
// Each file is an `Envelope` carrying a schema version and kind tag that are
// checked on load, so a stale or foreign file surfaces as a typed
// compatibility error instead of being half-read. The predictor never touches
// evaluation.json and a reporting process never touches classifier.json.
//
// Writes serialize all three payloads first, then replace each file by
// writing a temp file in the same directory and renaming it over the target.
// A run that fails before that point leaves the previous artifacts intact.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

use crate::classifier::TrainedModel;
use crate::evaluation::EvaluationArtifacts;
use crate::labels::LabelSpace;

/// Bumped whenever a payload's shape changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Classifier,
    LabelSpace,
    Evaluation,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Classifier,
        ArtifactKind::LabelSpace,
        ArtifactKind::Evaluation,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Classifier => "classifier.json",
            ArtifactKind::LabelSpace => "label_space.json",
            ArtifactKind::Evaluation => "evaluation.json",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Classifier => "classifier",
            ArtifactKind::LabelSpace => "label_space",
            ArtifactKind::Evaluation => "evaluation",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{kind} artifact not found at {}: run `medtag train` first", .path.display())]
    Missing { kind: ArtifactKind, path: PathBuf },

    #[error(
        "{kind} artifact at {} has schema version {found}, this build reads version {expected}; retrain to regenerate it",
        .path.display()
    )]
    Incompatible {
        kind: ArtifactKind,
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("{} holds a {found:?} artifact, expected {expected}", .path.display())]
    WrongKind {
        path: PathBuf,
        found: String,
        expected: ArtifactKind,
    },

    #[error("{kind} artifact at {} is corrupt", .path.display())]
    Corrupt {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize {kind} artifact")]
    Serialize {
        kind: ArtifactKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    pub fn is_missing(&self) -> bool {
        matches!(self, ArtifactError::Missing { .. })
    }
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    schema_version: u32,
    kind: &'a str,
    created_at: DateTime<Utc>,
    payload: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    schema_version: u32,
    kind: String,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct OwnedEnvelope<T> {
    payload: T,
}

/// A loaded artifact and when it was written.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub value: T,
    pub created_at: DateTime<Utc>,
}

/// Reads and writes artifacts in a single directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, kind: ArtifactKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    pub fn exists(&self, kind: ArtifactKind) -> bool {
        self.path(kind).is_file()
    }

    pub fn load_classifier(&self) -> Result<Loaded<TrainedModel>, ArtifactError> {
        self.load(ArtifactKind::Classifier)
    }

    pub fn load_label_space(&self) -> Result<Loaded<LabelSpace>, ArtifactError> {
        self.load(ArtifactKind::LabelSpace)
    }

    pub fn load_evaluation(&self) -> Result<Loaded<EvaluationArtifacts>, ArtifactError> {
        self.load(ArtifactKind::Evaluation)
    }

    /// Version and timestamp of an artifact without parsing its payload.
    pub fn header(&self, kind: ArtifactKind) -> Result<(u32, DateTime<Utc>), ArtifactError> {
        let path = self.path(kind);
        let bytes = read(kind, &path)?;
        let header = parse_header(kind, &path, &bytes)?;
        Ok((header.schema_version, header.created_at))
    }

    fn load<T: DeserializeOwned>(&self, kind: ArtifactKind) -> Result<Loaded<T>, ArtifactError> {
        let path = self.path(kind);
        let bytes = read(kind, &path)?;
        let header = parse_header(kind, &path, &bytes)?;

        if header.kind != kind.as_str() {
            return Err(ArtifactError::WrongKind {
                path,
                found: header.kind,
                expected: kind,
            });
        }
        if header.schema_version != SCHEMA_VERSION {
            return Err(ArtifactError::Incompatible {
                kind,
                path,
                found: header.schema_version,
                expected: SCHEMA_VERSION,
            });
        }

        let envelope: OwnedEnvelope<T> = serde_json::from_slice(&bytes)
            .map_err(|source| ArtifactError::Corrupt {
                kind,
                path: path.clone(),
                source,
            })?;

        Ok(Loaded {
            value: envelope.payload,
            created_at: header.created_at,
        })
    }

    /// Persist the outputs of a successful training run.
    pub fn save_training_run(
        &self,
        model: &TrainedModel,
        labels: &LabelSpace,
        evaluation: &EvaluationArtifacts,
    ) -> Result<(), ArtifactError> {
        let created_at = Utc::now();
        let staged = [
            (ArtifactKind::Classifier, encode(ArtifactKind::Classifier, model, created_at)?),
            (ArtifactKind::LabelSpace, encode(ArtifactKind::LabelSpace, labels, created_at)?),
            (ArtifactKind::Evaluation, encode(ArtifactKind::Evaluation, evaluation, created_at)?),
        ];

        std::fs::create_dir_all(&self.dir).map_err(|source| ArtifactError::Io {
            path: self.dir.clone(),
            source,
        })?;

        for (kind, bytes) in &staged {
            self.replace(*kind, bytes)?;
        }

        info!(dir = %self.dir.display(), "Saved training artifacts");
        Ok(())
    }

    fn replace(&self, kind: ArtifactKind, bytes: &[u8]) -> Result<(), ArtifactError> {
        let target = self.path(kind);
        let io_err = |source| ArtifactError::Io {
            path: target.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&target).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

fn encode<T: Serialize>(kind: ArtifactKind, payload: &T, created_at: DateTime<Utc>) -> Result<Vec<u8>, ArtifactError> {
    let envelope = Envelope {
        schema_version: SCHEMA_VERSION,
        kind: kind.as_str(),
        created_at,
        payload,
    };
    serde_json::to_vec_pretty(&envelope).map_err(|source| ArtifactError::Serialize { kind, source })
}

fn read(kind: ArtifactKind, path: &Path) -> Result<Vec<u8>, ArtifactError> {
    std::fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::Missing {
                kind,
                path: path.to_path_buf(),
            }
        } else {
            ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn parse_header(kind: ArtifactKind, path: &Path, bytes: &[u8]) -> Result<EnvelopeHeader, ArtifactError> {
    serde_json::from_slice(bytes).map_err(|source| ArtifactError::Corrupt {
        kind,
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_artifact_is_typed() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = store.load_label_space().unwrap_err();
        assert!(err.is_missing());
        assert!(err.to_string().contains("run `medtag train` first"));
    }

    #[test]
    fn test_version_mismatch_is_incompatible() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        std::fs::write(
            store.path(ArtifactKind::LabelSpace),
            r#"{"schema_version": 0, "kind": "label_space", "created_at": "2024-01-01T00:00:00Z", "payload": ["a"]}"#,
        )
        .unwrap();
        match store.load_label_space().unwrap_err() {
            ArtifactError::Incompatible {
                found, expected, ..
            } => {
                assert_eq!(found, 0);
                assert_eq!(expected, SCHEMA_VERSION);
            }
            other => panic!("expected Incompatible, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        std::fs::write(
            store.path(ArtifactKind::LabelSpace),
            r#"{"schema_version": 1, "kind": "evaluation", "created_at": "2024-01-01T00:00:00Z", "payload": ["a"]}"#,
        )
        .unwrap();
        assert!(matches!(
            store.load_label_space().unwrap_err(),
            ArtifactError::WrongKind { .. }
        ));
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        std::fs::write(store.path(ArtifactKind::LabelSpace), b"not json").unwrap();
        assert!(matches!(
            store.load_label_space().unwrap_err(),
            ArtifactError::Corrupt { .. }
        ));
    }

    #[test]
    fn test_encoded_label_space_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let labels = LabelSpace::from_classes(vec!["a".into(), "b".into()]).unwrap();
        let bytes = encode(ArtifactKind::LabelSpace, &labels, Utc::now()).unwrap();
        store.replace(ArtifactKind::LabelSpace, &bytes).unwrap();

        let loaded = store.load_label_space().unwrap();
        assert_eq!(loaded.value, labels);
        assert_eq!(store.header(ArtifactKind::LabelSpace).unwrap().0, SCHEMA_VERSION);
    }
}
