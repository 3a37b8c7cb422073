// Shared fixtures for the integration suites.
//
// `KeywordEmbedder` stands in for the ONNX model: each dimension is 1.0 when
// the text mentions one keyword, plus a constant bias feature. It is fully
// deterministic and needs no model files.

#![allow(dead_code)]

use std::collections::BTreeSet;

use medtag::corpus::{Article, CorpusRow};
use medtag::embedding::traits::{EmbedderIdentity, Embedding, TextEmbedder};

pub const KEYWORDS: [&str; 3] = ["heart", "brain", "tumor"];

pub struct KeywordEmbedder {
    pub model: String,
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self {
            model: "keyword-test".to_string(),
        }
    }
}

impl TextEmbedder for KeywordEmbedder {
    fn identity(&self) -> EmbedderIdentity {
        EmbedderIdentity {
            model: self.model.clone(),
            dimension: KEYWORDS.len() + 1,
        }
    }

    fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Embedding>> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let mut v: Vec<f64> = KEYWORDS
                    .iter()
                    .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
                    .collect();
                v.push(1.0);
                v
            })
            .collect())
    }
}

pub fn labels(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// The (title, abstract, group) of synthetic article `i`.
///
/// Four repeating topics: heart -> cardiovascular, brain -> neurological,
/// tumor -> oncological, heart+brain -> both of the first two.
pub fn synthetic(i: usize) -> (String, String, &'static str) {
    match i % 4 {
        0 => (
            format!("Heart failure cohort {i}"),
            "Ejection fraction in heart patients".to_string(),
            "cardiovascular",
        ),
        1 => (
            format!("Brain imaging study {i}"),
            "Cortical thinning in the brain".to_string(),
            "neurological",
        ),
        2 => (
            format!("Tumor response trial {i}"),
            "Tumor shrinkage after chemotherapy".to_string(),
            "oncological",
        ),
        _ => (
            format!("Heart and brain outcomes {i}"),
            "Stroke after heart surgery affects the brain".to_string(),
            "cardiovascular|neurological",
        ),
    }
}

pub fn synthetic_articles(n: usize) -> Vec<Article> {
    (0..n)
        .map(|i| {
            let (title, abstract_text, group) = synthetic(i);
            Article::new(title, abstract_text, medtag::corpus::parse_labels(group))
        })
        .collect()
}

pub fn synthetic_rows(n: usize) -> Vec<CorpusRow> {
    (0..n)
        .map(|i| {
            let (title, abstract_text, group) = synthetic(i);
            CorpusRow::new(&title, &abstract_text, group)
        })
        .collect()
}

/// Write rows as a `;`-delimited corpus file.
pub fn write_corpus(path: &std::path::Path, rows: &[CorpusRow]) {
    let mut out = String::from("title;abstract;group\n");
    for row in rows {
        out.push_str(&format!(
            "{};{};{}\n",
            row.title.as_deref().unwrap_or(""),
            row.abstract_text.as_deref().unwrap_or(""),
            row.group.as_deref().unwrap_or("")
        ));
    }
    std::fs::write(path, out).unwrap();
}
