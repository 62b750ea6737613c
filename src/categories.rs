//! Category index loaded from `categories.json` in the content root.
//!
//! ```json
//! {
//!   "software": { "title": "Software", "long_description": "Things I built." },
//!   "writing":  { "title": "Writing",  "long_description": "Things I wrote." }
//! }
//! ```
//!
//! The file is optional: a site without it has no categories yet, which the
//! HTTP layer renders as an empty state rather than an error.

use crate::storage::{Storage, StorageError};
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

pub const CATEGORIES_FILE: &str = "categories.json";

#[derive(Error, Debug)]
pub enum CategoryError {
    #[error("{CATEGORIES_FILE} not found")]
    ConfigurationMissing,
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Invalid {CATEGORIES_FILE}: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryEntry {
    pub title: String,
    #[serde(default)]
    pub long_description: String,
}

/// Parsed category index, keyed and iterated by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Categories {
    entries: BTreeMap<String, CategoryEntry>,
}

impl Categories {
    pub fn from_json(text: &str) -> Result<Self, CategoryError> {
        let entries: BTreeMap<String, CategoryEntry> = serde_json::from_str(text)?;
        Ok(Self { entries })
    }

    pub fn resolve(&self, id: &str) -> Option<&CategoryEntry> {
        self.entries.get(id)
    }

    pub fn title(&self, id: &str) -> Option<&str> {
        self.resolve(id).map(|e| e.title.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryEntry)> {
        self.entries.iter().map(|(id, e)| (id.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Loader for the category index. Reads fresh on every call.
pub struct CategoryIndex;

impl CategoryIndex {
    pub fn load(storage: &dyn Storage) -> Result<Categories, CategoryError> {
        let text = match storage.read_string(CATEGORIES_FILE) {
            Ok(text) => text,
            Err(StorageError::NotFound(_)) => return Err(CategoryError::ConfigurationMissing),
            Err(e) => return Err(e.into()),
        };
        Categories::from_json(&text)
    }
}
