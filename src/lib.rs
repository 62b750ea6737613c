//! # Folio
//!
//! A small personal website server. A directory of markdown files with YAML
//! front-matter is the whole database: each file is one project article,
//! `categories.json` names the categories articles can be filed under, and
//! `images/` holds the pictures articles embed.
//!
//! ```text
//! projects/
//! ├── categories.json        {"rust": {"title": "Rust", "long_description": "..."}}
//! ├── hello.md               ---\nid: hello\ntitle: Hello\ndate: 2024-01-05\n---\n...
//! ├── talk.md                link: https://example.org/talk   (redirects)
//! └── images/
//!     ├── photo.jpg
//!     └── 640-0-photo.jpg    (derived on first request, kept forever)
//! ```
//!
//! # Request Flow
//!
//! Every request re-reads the content root through a [`storage::Storage`]
//! handle, so edits show up without a restart:
//!
//! ```text
//! HTTP ─▶ server ─▶ content / categories ─▶ render ─▶ HTML
//!              └──▶ thumbnail ─▶ imaging ─▶ storage (images/{w}-{h}-{name})
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`storage`] | File-store trait with local-directory and in-memory implementations |
//! | [`content`] | Front-matter parsing, publish-date filtering, lookups by id and metadata |
//! | [`categories`] | `categories.json` index |
//! | [`naming`] | `{w}-{h}-{name}` derived image filename convention |
//! | [`imaging`] | Pure-Rust decode and resize behind the [`imaging::ImageBackend`] trait |
//! | [`thumbnail`] | Write-once bounded thumbnail cache |
//! | [`render`] | Maud page templates and markdown rendering |
//! | [`sitemap`] | `sitemap.xml` generation |
//! | [`server`] | axum routes and error-to-response mapping |
//! | [`config`] | Layered `config.toml` loading and validation |
//! | [`output`] | CLI output formatting for `folio check` |
//!
//! # Design Decisions
//!
//! ## No Index, No Watcher
//!
//! Personal sites hold tens of documents. Re-reading them per request costs
//! less than keeping an index coherent with hand edits, and rayon parses the
//! files in parallel.
//!
//! ## Dates Gate Publication
//!
//! A document dated in the future is invisible everywhere (listing, category
//! pages, sitemap, direct links) until that day. Undated documents are live.
//!
//! ## Duplicate Ids Are Loud
//!
//! Two files claiming one id is an authoring mistake. Resolving that id is a
//! 500 naming both files rather than silently picking one.

pub mod categories;
pub mod config;
pub mod content;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod render;
pub mod server;
pub mod sitemap;
pub mod storage;
pub mod thumbnail;

#[cfg(test)]
pub(crate) mod test_helpers;
