// Corpus loading — semicolon-delimited CSV into training articles.
//
// The raw files carry `title`, `abstract` and `group` columns, where `group`
// is a pipe-delimited label list ("cardiovascular|neurological"). Rows are
// kept as `CorpusRow` (all fields optional, exactly as read) until they are
// converted into `Article`s, so the retraining merge can deduplicate on the
// raw (title, abstract) identity before any filtering happens.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Field delimiter of corpus files.
pub const CSV_DELIMITER: u8 = b';';

/// Separator between labels inside the `group` column.
pub const LABEL_DELIMITER: char = '|';

const REQUIRED_COLUMNS: [&str; 3] = ["title", "abstract", "group"];

/// One row of a corpus file, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRow {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

impl CorpusRow {
    pub fn new(title: &str, abstract_text: &str, group: &str) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            title: non_empty(title),
            abstract_text: non_empty(abstract_text),
            group: non_empty(group),
        }
    }

    /// Convert into a training article.
    ///
    /// Returns `None` when the row has no usable labels or its derived text is
    /// blank; such rows never reach the trainer.
    pub fn into_article(self) -> Option<Article> {
        let labels = parse_labels(self.group.as_deref()?);
        if labels.is_empty() {
            return None;
        }
        let article = Article::new(
            self.title.unwrap_or_default(),
            self.abstract_text.unwrap_or_default(),
            labels,
        );
        article.is_trainable().then_some(article)
    }
}

/// A labelled medical article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub abstract_text: String,
    pub labels: BTreeSet<String>,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        abstract_text: impl Into<String>,
        labels: BTreeSet<String>,
    ) -> Self {
        Self {
            title: title.into(),
            abstract_text: abstract_text.into(),
            labels,
        }
    }

    /// The text that gets embedded: title and abstract joined by a space.
    pub fn text(&self) -> String {
        article_text(&self.title, &self.abstract_text)
    }

    /// At least one label and non-blank text.
    pub fn is_trainable(&self) -> bool {
        !self.labels.is_empty() && !self.text().trim().is_empty()
    }
}

/// Join title and abstract the same way for training and for inference.
pub fn article_text(title: &str, abstract_text: &str) -> String {
    format!("{title} {abstract_text}")
}

/// Split a `group` value on `|`, trimming whitespace and dropping empty parts.
pub fn parse_labels(group: &str) -> BTreeSet<String> {
    group
        .split(LABEL_DELIMITER)
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read every row of a corpus file.
pub fn read_rows(path: &Path) -> Result<Vec<CorpusRow>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open corpus file: {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(CSV_DELIMITER)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header row of {}", path.display()))?
        .clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            anyhow::bail!(
                "Corpus file {} is missing the `{}` column (expected `;`-delimited title;abstract;group)",
                path.display(),
                column
            );
        }
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize::<CorpusRow>().enumerate() {
        let row = result
            .with_context(|| format!("Failed to read record {} in {}", idx, path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Convert raw rows into trainable articles, dropping unusable rows.
pub fn articles_from_rows(rows: Vec<CorpusRow>) -> Vec<Article> {
    let total = rows.len();
    let articles: Vec<Article> = rows.into_iter().filter_map(CorpusRow::into_article).collect();
    let dropped = total - articles.len();
    if dropped > 0 {
        warn!(dropped, "Dropped corpus rows with no labels or blank text");
    }
    articles
}

/// Read a corpus file straight into trainable articles.
pub fn load_articles(path: &Path) -> Result<Vec<Article>> {
    let articles = articles_from_rows(read_rows(path)?);
    info!(rows = articles.len(), path = %path.display(), "Loaded corpus");
    Ok(articles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels_splits_on_pipe() {
        let labels = parse_labels("neurological|cardiovascular");
        assert_eq!(
            labels.into_iter().collect::<Vec<_>>(),
            vec!["cardiovascular", "neurological"]
        );
    }

    #[test]
    fn test_parse_labels_drops_blank_parts() {
        let labels = parse_labels(" hepatorenal || ");
        assert_eq!(labels.len(), 1);
        assert!(labels.contains("hepatorenal"));
    }

    #[test]
    fn test_text_joins_with_space() {
        let row = CorpusRow::new("Title", "Abstract", "a");
        assert_eq!(row.into_article().unwrap().text(), "Title Abstract");
    }

    #[test]
    fn test_missing_abstract_is_empty_string() {
        let row = CorpusRow::new("Only title", "", "a");
        assert_eq!(row.into_article().unwrap().text(), "Only title ");
    }

    #[test]
    fn test_row_without_group_is_dropped() {
        assert!(CorpusRow::new("t", "a", "").into_article().is_none());
    }

    #[test]
    fn test_row_with_blank_text_is_dropped() {
        assert!(CorpusRow::new("", "", "a").into_article().is_none());
        assert!(CorpusRow::new("  ", " ", "a").into_article().is_none());
    }

    #[test]
    fn test_read_rows_semicolon_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.csv");
        std::fs::write(
            &path,
            "title;abstract;group\n\
             Heart failure;Ejection fraction study;cardiovascular\n\
             Stroke;;neurological|cardiovascular\n\
             ;;\n",
        )
        .unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].abstract_text, None);

        let articles = articles_from_rows(rows);
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[1].labels.len(), 2);
    }

    #[test]
    fn test_read_rows_tolerates_padded_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("padded.csv");
        std::fs::write(
            &path,
            " title ; abstract ;group \n\
             Heart failure;Ejection fraction study;cardiovascular\n",
        )
        .unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title.as_deref(), Some("Heart failure"));
        assert_eq!(rows[0].abstract_text.as_deref(), Some("Ejection fraction study"));
        assert_eq!(rows[0].group.as_deref(), Some("cardiovascular"));
        assert_eq!(articles_from_rows(rows).len(), 1);
    }

    #[test]
    fn test_read_rows_requires_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "title;body\nx;y\n").unwrap();
        let err = read_rows(&path).unwrap_err();
        assert!(err.to_string().contains("abstract"));
    }
}
