//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! serialized to a TOML table and the user's file is merged on top, so a
//! config only needs the keys it wants to change.
//!
//! ## Config File Location
//!
//! `config.toml` is looked up in the directory given by `--config-dir`
//! (default: the working directory):
//!
//! ```text
//! site/
//! ├── config.toml
//! ├── .buildinfo.json          # optional, {"date": "YYYY-MM-DD"}
//! └── projects/                # content_root
//!     ├── categories.json
//!     ├── some-project.md
//!     └── images/
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! content_root = "projects"     # Markdown + images directory, relative to config dir
//!
//! [site]
//! title = "Projects"
//! description = "A selection of projects I've been involved in"
//! base_url = ""                 # Absolute URL for the sitemap; empty = from Host header
//! build_info = ".buildinfo.json"
//!
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [images]
//! quality = 90                  # JPEG quality for generated thumbnails (1-100)
//!
//! [listing]
//! excerpt_words = 200           # Words of body text shown per listing card
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Path to the content root, relative to the config directory.
    #[serde(default = "default_content_root")]
    pub content_root: String,
    /// Titles and URLs.
    pub site: SiteInfo,
    /// HTTP listener.
    pub server: ServerConfig,
    /// Thumbnail encoding.
    pub images: ImagesConfig,
    /// Listing page layout.
    pub listing: ListingConfig,
}

fn default_content_root() -> String {
    "projects".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_root: default_content_root(),
            site: SiteInfo::default(),
            server: ServerConfig::default(),
            images: ImagesConfig::default(),
            listing: ListingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.images.quality) {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.listing.excerpt_words == 0 {
            return Err(ConfigError::Validation(
                "listing.excerpt_words must be greater than 0".into(),
            ));
        }
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "server.bind '{}' is not a socket address (e.g. 127.0.0.1:8080)",
                self.server.bind
            )));
        }
        let base = &self.site.base_url;
        if !base.is_empty() && !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(ConfigError::Validation(
                "site.base_url must be empty or start with http:// or https://".into(),
            ));
        }
        if self.content_root.trim().is_empty() {
            return Err(ConfigError::Validation(
                "content_root must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Content root resolved against the directory the config was loaded from.
    pub fn content_path(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.content_root)
    }

    /// Build-info file resolved against the config directory.
    pub fn build_info_path(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.site.build_info)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteInfo {
    /// Heading of the listing page.
    pub title: String,
    /// Subtitle of the listing page.
    pub description: String,
    /// Absolute site URL used in the sitemap. Empty derives it per request.
    pub base_url: String,
    /// JSON file carrying the deploy date shown as the sitemap's `lastmod`.
    pub build_info: String,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            title: "Projects".to_string(),
            description: "A selection of projects I've been involved in".to_string(),
            base_url: String::new(),
            build_info: ".buildinfo.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// JPEG quality for generated thumbnails (1-100).
    pub quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self { quality: 90 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListingConfig {
    /// Words of paragraph text in each listing excerpt.
    pub excerpt_words: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self { excerpt_words: 200 }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Folio Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# Directory holding the markdown documents, categories.json and images/,
# relative to this file.
content_root = "projects"

# ---------------------------------------------------------------------------
# Site
# ---------------------------------------------------------------------------
[site]
# Heading and subtitle of the project listing.
title = "Projects"
description = "A selection of projects I've been involved in"

# Absolute URL used for sitemap entries, e.g. "https://example.com".
# Leave empty to build it from the request's Host header (always https).
base_url = ""

# JSON file with the deploy date, {"date": "YYYY-MM-DD"}. Used as the
# sitemap lastmod for static pages. Missing file = 1970-01-01.
build_info = ".buildinfo.json"

# ---------------------------------------------------------------------------
# Server
# ---------------------------------------------------------------------------
[server]
# Address the HTTP server listens on. Overridden by `serve --bind`.
bind = "127.0.0.1:8080"

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[images]
# JPEG encoding quality for generated thumbnails (1 = worst, 100 = best).
# Other formats are re-encoded losslessly.
quality = 90

# ---------------------------------------------------------------------------
# Listing
# ---------------------------------------------------------------------------
[listing]
# Number of words of paragraph text shown in each listing card.
excerpt_words = 200
"##
}
