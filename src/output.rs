//! CLI output formatting for `folio check`.
//!
//! Output is **information-centric, not file-centric**: each document is
//! shown by its position and title, with its source file and front-matter
//! details as indented context lines.
//!
//! ```text
//! Documents
//! 001 Hello, world (2024-01-05)
//!     Source: hello.md
//!     Id: hello
//!     Categories: rust, web
//! 002 My talk → https://example.org/talk
//!     Source: talk.md
//!     Id: talk
//!
//! Failures
//!     broken.md: Front matter error in broken.md: ...
//!
//! Duplicate ids
//!     hello: a.md, hello.md
//!
//! Categories
//!     rust: Rust
//!     web: Web
//!
//! Thumbnails
//!     photo.jpg: 0x300, 640x480
//!
//! 2 documents, 1 failure, 1 duplicate id
//! ```
//!
//! [`format_check_output`] is pure and returns lines for testability;
//! [`print_check_output`] writes them to stdout.

use crate::categories::Categories;
use crate::content::{ContentReport, duplicate_ids, sorted_listing};
use crate::naming::DerivedName;
use std::collections::BTreeMap;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Check
// ============================================================================

/// Everything `check` reports on.
pub struct CheckSummary<'a> {
    pub report: &'a ContentReport,
    /// `None` when `categories.json` is absent.
    pub categories: Option<&'a Categories>,
    pub derivatives: &'a [DerivedName],
}

impl CheckSummary<'_> {
    /// Whether the content would serve without integrity errors.
    pub fn is_clean(&self) -> bool {
        self.report.failures.is_empty() && duplicate_ids(&self.report.documents).is_empty()
    }
}

pub fn format_check_output(summary: &CheckSummary) -> Vec<String> {
    let mut lines = Vec::new();
    let documents = sorted_listing(summary.report.documents.clone());

    lines.push("Documents".to_string());
    for (i, doc) in documents.iter().enumerate() {
        let mut header = format!("{} {}", format_index(i + 1), doc.title());
        if let Some(date) = doc.date() {
            header.push_str(&format!(" ({})", date.format("%Y-%m-%d")));
        }
        if let Some(link) = doc.link() {
            header.push_str(&format!(" → {link}"));
        }
        lines.push(header);
        lines.push(format!("{}Source: {}", indent(1), doc.source));
        lines.push(format!("{}Id: {}", indent(1), doc.id()));
        let categories = doc.categories();
        if !categories.is_empty() {
            lines.push(format!("{}Categories: {}", indent(1), categories.join(", ")));
        }
    }

    if !summary.report.failures.is_empty() {
        lines.push(String::new());
        lines.push("Failures".to_string());
        for failure in &summary.report.failures {
            lines.push(format!("{}{}: {}", indent(1), failure.source, failure.error));
        }
    }

    let duplicates = duplicate_ids(&summary.report.documents);
    if !duplicates.is_empty() {
        lines.push(String::new());
        lines.push("Duplicate ids".to_string());
        for (id, sources) in &duplicates {
            lines.push(format!("{}{}: {}", indent(1), id, sources.join(", ")));
        }
    }

    lines.push(String::new());
    lines.push("Categories".to_string());
    match summary.categories {
        None => lines.push(format!("{}(no categories.json)", indent(1))),
        Some(categories) => {
            for (id, entry) in categories.iter() {
                lines.push(format!("{}{}: {}", indent(1), id, entry.title));
            }
        }
    }

    if !summary.derivatives.is_empty() {
        let mut by_original: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for derived in summary.derivatives {
            by_original
                .entry(&derived.original)
                .or_default()
                .push(format!("{}x{}", derived.width, derived.height));
        }
        lines.push(String::new());
        lines.push("Thumbnails".to_string());
        for (original, sizes) in by_original {
            lines.push(format!("{}{}: {}", indent(1), original, sizes.join(", ")));
        }
    }

    lines.push(String::new());
    let mut totals = vec![plural(documents.len(), "document")];
    if !summary.report.failures.is_empty() {
        totals.push(plural(summary.report.failures.len(), "failure"));
    }
    if !duplicates.is_empty() {
        totals.push(plural(duplicates.len(), "duplicate id"));
    }
    lines.push(totals.join(", "));

    lines
}

pub fn print_check_output(summary: &CheckSummary) {
    for line in format_check_output(summary) {
        println!("{}", line);
    }
}
