//! Markdown content repository.
//!
//! The content root is a flat directory of markdown files, each opening with
//! a YAML front-matter block:
//!
//! ```text
//! ---
//! id: rust-thumbnailer
//! title: A thumbnailer in Rust
//! date: 2024-01-01
//! categories: [software, imaging]
//! ---
//! Body in **markdown**.
//! ```
//!
//! ## Keys
//!
//! | Key | Required | Meaning |
//! |---|---|---|
//! | `id` | yes | URL identifier, unique among live documents |
//! | `title` | yes | Display title |
//! | `date` | expected | Publish date; future dates hide the document |
//! | `categories` | no | A single category id or a list of them |
//! | `link` | no | External URL; the document is listed but redirects |
//!
//! Any other key is kept in [`Document::metadata`] and can be queried with
//! [`ContentRepository::find_by_meta_key`].
//!
//! ## Reads are always fresh
//!
//! Every call re-lists and re-parses the directory. Editing a file on disk
//! is visible on the next request; there is nothing to invalidate.
//!
//! ## Broken files
//!
//! A file with unreadable front-matter, or without `id`/`title`, is skipped
//! with a warning so one bad draft cannot take the whole listing down.
//! [`ContentRepository::load_report`] returns the failures alongside the
//! documents for the `check` command, which treats any failure as fatal.
//! A missing or unparseable `date` keeps the document (warned) and sorts it
//! last; undated documents count as live.

use crate::storage::{Storage, StorageError};
use chrono::{Local, NaiveDate};
use rayon::prelude::*;
use serde_yaml_ng::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Invalid front-matter in {0}: {1}")]
    FrontMatter(String, String),
    #[error("Missing front-matter key '{1}' in {0}")]
    MissingKey(String, &'static str),
    #[error("No document with id '{0}'")]
    NotFound(String),
    #[error("Duplicate document id '{id}' in {}", .sources.join(", "))]
    Integrity { id: String, sources: Vec<String> },
}

/// One markdown content unit: front-matter metadata plus body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Storage path the document was read from.
    pub source: String,
    /// Markdown body, front-matter removed.
    pub content: String,
    /// Every front-matter key, including the typed ones below.
    pub metadata: BTreeMap<String, Value>,
    id: String,
    title: String,
    date: Option<NaiveDate>,
}

impl Document {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Category ids, whether written as a scalar or a list.
    pub fn categories(&self) -> Vec<&str> {
        match self.metadata.get("categories") {
            Some(Value::String(s)) => vec![s.as_str()],
            Some(Value::Sequence(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// External URL for link documents.
    pub fn link(&self) -> Option<&str> {
        self.metadata.get("link").and_then(Value::as_str)
    }

    pub fn is_link(&self) -> bool {
        self.link().is_some()
    }

    /// Whether the document is published on `today`.
    pub fn is_live_on(&self, today: NaiveDate) -> bool {
        self.date.is_none_or(|d| d <= today)
    }

    /// `metadata[key] == value`, or `metadata[key]` is a list containing `value`.
    pub fn matches_meta(&self, key: &str, value: &str) -> bool {
        match self.metadata.get(key) {
            Some(Value::Sequence(items)) => items.iter().any(|item| scalar_eq(item, value)),
            Some(other) => scalar_eq(other, value),
            None => false,
        }
    }
}

/// Compare a YAML scalar against request input, which is always text.
fn scalar_eq(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s == needle,
        Value::Number(n) => n.to_string() == needle,
        Value::Bool(b) => b.to_string() == needle,
        _ => false,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse `YYYY-MM-DD`, or a datetime whose first ten characters are one.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
}

/// Split a `---` delimited front-matter block from the body.
///
/// Returns `None` when the text does not open with a `---` line or the block
/// is never closed. The closing line may be `---` or `...`.
pub fn split_front_matter(text: &str) -> Option<(&str, &str)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }
    let start = first.len();
    let mut offset = start;
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            let yaml = &text[start..offset];
            let body = &text[offset + line.len()..];
            return Some((yaml, body.trim_start_matches(['\r', '\n'])));
        }
        offset += line.len();
    }
    None
}

/// Parse one markdown file. `source` is only used for error messages and
/// recorded on the document.
pub fn parse_document(source: &str, text: &str) -> Result<Document, ContentError> {
    let (yaml, body) = split_front_matter(text)
        .ok_or_else(|| ContentError::FrontMatter(source.into(), "no front-matter block".into()))?;

    let metadata: BTreeMap<String, Value> = if yaml.trim().is_empty() {
        BTreeMap::new()
    } else {
        serde_yaml_ng::from_str(yaml)
            .map_err(|e| ContentError::FrontMatter(source.into(), e.to_string()))?
    };

    let id = metadata
        .get("id")
        .and_then(scalar_string)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ContentError::MissingKey(source.into(), "id"))?;
    let title = metadata
        .get("title")
        .and_then(scalar_string)
        .ok_or_else(|| ContentError::MissingKey(source.into(), "title"))?;

    let date = match metadata.get("date") {
        Some(value) => {
            let parsed = value.as_str().and_then(parse_date);
            if parsed.is_none() {
                log::warn!("{source}: unreadable date {value:?}, sorting it last");
            }
            parsed
        }
        None => {
            log::warn!("{source}: no date, treating as published and sorting it last");
            None
        }
    };

    Ok(Document {
        source: source.to_string(),
        content: body.to_string(),
        metadata,
        id,
        title,
        date,
    })
}

/// A file that could not be turned into a [`Document`].
#[derive(Debug)]
pub struct LoadFailure {
    pub source: String,
    pub error: ContentError,
}

/// Every document in the content root plus the files that failed to parse.
#[derive(Debug, Default)]
pub struct ContentReport {
    pub documents: Vec<Document>,
    pub failures: Vec<LoadFailure>,
}

/// Reads documents from a [`Storage`] root on every call.
#[derive(Clone)]
pub struct ContentRepository {
    storage: Arc<dyn Storage>,
    today: Option<NaiveDate>,
}

impl ContentRepository {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            today: None,
        }
    }

    /// Pin "today" instead of reading the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Parse every `*.md` file, keeping per-file failures.
    ///
    /// A missing content root is an empty site, not an error.
    pub fn load_report(&self) -> Result<ContentReport, ContentError> {
        let files = match self.storage.list("") {
            Ok(files) => files,
            Err(StorageError::NotFound(_)) => {
                log::warn!("content root does not exist yet; serving an empty site");
                return Ok(ContentReport::default());
            }
            Err(e) => return Err(e.into()),
        };

        let markdown: Vec<String> = files
            .into_iter()
            .filter(|p| {
                std::path::Path::new(p)
                    .extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case("md"))
            })
            .collect();

        let results: Vec<(String, Result<Document, ContentError>)> = markdown
            .par_iter()
            .map(|path| {
                let parsed = self
                    .storage
                    .read_string(path)
                    .map_err(ContentError::from)
                    .and_then(|text| parse_document(path, &text));
                (path.clone(), parsed)
            })
            .collect();

        let mut report = ContentReport::default();
        for (source, result) in results {
            match result {
                Ok(doc) => report.documents.push(doc),
                Err(error) => report.failures.push(LoadFailure { source, error }),
            }
        }
        Ok(report)
    }

    /// Every parseable document, in no particular order.
    pub fn list_all(&self) -> Result<Vec<Document>, ContentError> {
        let report = self.load_report()?;
        for failure in &report.failures {
            log::warn!("skipping {}: {}", failure.source, failure.error);
        }
        Ok(report.documents)
    }

    /// Documents whose date is not after today.
    pub fn list_live(&self) -> Result<Vec<Document>, ContentError> {
        let today = self.today();
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|d| d.is_live_on(today))
            .collect())
    }

    /// Live documents whose `key` equals `value` or lists it.
    pub fn find_by_meta_key(&self, key: &str, value: &str) -> Result<Vec<Document>, ContentError> {
        Ok(self
            .list_live()?
            .into_iter()
            .filter(|d| d.matches_meta(key, value))
            .collect())
    }

    /// All live documents carrying `id`. More than one is an integrity
    /// problem the caller must surface; see [`Self::resolve_article`].
    pub fn find_by_id(&self, id: &str) -> Result<Vec<Document>, ContentError> {
        self.find_by_meta_key("id", id)
    }

    /// Exactly one live document for `id`, or `NotFound`/`Integrity`.
    pub fn resolve_article(&self, id: &str) -> Result<Document, ContentError> {
        let mut found = self.find_by_id(id)?;
        match found.len() {
            0 => Err(ContentError::NotFound(id.to_string())),
            1 => Ok(found.remove(0)),
            _ => {
                let mut sources: Vec<String> = found.into_iter().map(|d| d.source).collect();
                sources.sort();
                Err(ContentError::Integrity {
                    id: id.to_string(),
                    sources,
                })
            }
        }
    }
}

/// Newest first. Undated documents go last, keeping their relative order.
pub fn sorted_listing(mut documents: Vec<Document>) -> Vec<Document> {
    documents.sort_by(|a, b| match (a.date, b.date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    documents
}

/// Ids carried by more than one document, with the files carrying them.
pub fn duplicate_ids(documents: &[Document]) -> BTreeMap<String, Vec<String>> {
    let mut by_id: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for doc in documents {
        by_id
            .entry(doc.id.clone())
            .or_default()
            .push(doc.source.clone());
    }
    by_id.retain(|_, sources| sources.len() > 1);
    for sources in by_id.values_mut() {
        sources.sort();
    }
    by_id
}
