// Label space — the canonical class ordering shared by training and inference.
//
// Classes are the lexicographically sorted union of every label seen at fit
// time. The ordering is persisted next to the classifier so that column i of
// a multi-hot vector and sub-model i of the classifier always mean the same
// label. Nothing at inference time ever recomputes it from incoming data.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry per class in `LabelSpace` order; `true` iff the article carries
/// that label.
pub type MultiHotLabelVector = Vec<bool>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelError {
    /// A label that was not present when the label space was fit.
    #[error("unknown label {label:?}: not present in the fitted label space")]
    UnknownLabel { label: String },

    /// A class index outside `0..len`. Indices only come from our own
    /// classifier, so this signals a programming error.
    #[error("label index {index} out of range for a label space of {len} classes")]
    IndexOutOfRange { index: usize, len: usize },

    /// A persisted class list that is not sorted and duplicate-free.
    #[error("label space classes must be sorted and distinct (offending class {label:?})")]
    NotCanonical { label: String },
}

/// Ordered, distinct label strings. Immutable once fit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LabelSpace {
    classes: Vec<String>,
}

impl LabelSpace {
    /// Compute the sorted union of all labels across all examples.
    pub fn fit<'a, I>(label_sets: I) -> Self
    where
        I: IntoIterator<Item = &'a BTreeSet<String>>,
    {
        let union: BTreeSet<&String> = label_sets.into_iter().flatten().collect();
        Self {
            classes: union.into_iter().cloned().collect(),
        }
    }

    /// Build a label space from an already-canonical class list.
    pub fn from_classes(classes: Vec<String>) -> Result<Self, LabelError> {
        for pair in classes.windows(2) {
            if pair[0] >= pair[1] {
                return Err(LabelError::NotCanonical {
                    label: pair[1].clone(),
                });
            }
        }
        Ok(Self { classes })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Index of a label, if it belongs to this space.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .ok()
    }

    /// Label at a class index.
    pub fn name(&self, index: usize) -> Result<&str, LabelError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(LabelError::IndexOutOfRange {
                index,
                len: self.classes.len(),
            })
    }

    /// Encode a single label set.
    pub fn transform_one(&self, labels: &BTreeSet<String>) -> Result<MultiHotLabelVector, LabelError> {
        let mut vector = vec![false; self.classes.len()];
        for label in labels {
            let index = self
                .position(label)
                .ok_or_else(|| LabelError::UnknownLabel {
                    label: label.clone(),
                })?;
            vector[index] = true;
        }
        Ok(vector)
    }

    /// Encode every label set. Fails on the first label outside the space.
    pub fn transform<'a, I>(&self, label_sets: I) -> Result<Vec<MultiHotLabelVector>, LabelError>
    where
        I: IntoIterator<Item = &'a BTreeSet<String>>,
    {
        label_sets
            .into_iter()
            .map(|labels| self.transform_one(labels))
            .collect()
    }

    /// Map class indices back to label strings.
    pub fn inverse<I>(&self, indices: I) -> Result<BTreeSet<String>, LabelError>
    where
        I: IntoIterator<Item = usize>,
    {
        indices
            .into_iter()
            .map(|index| self.name(index).map(str::to_string))
            .collect()
    }

    /// Decode a multi-hot vector produced against this space.
    pub fn inverse_vector(&self, vector: &[bool]) -> Result<BTreeSet<String>, LabelError> {
        if vector.len() > self.classes.len() {
            return Err(LabelError::IndexOutOfRange {
                index: vector.len() - 1,
                len: self.classes.len(),
            });
        }
        self.inverse(
            vector
                .iter()
                .enumerate()
                .filter_map(|(i, &set)| set.then_some(i)),
        )
    }
}

impl TryFrom<Vec<String>> for LabelSpace {
    type Error = LabelError;

    fn try_from(classes: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_classes(classes)
    }
}

impl From<LabelSpace> for Vec<String> {
    fn from(space: LabelSpace) -> Self {
        space.classes
    }
}
