//! `sitemap.xml` generation.
//!
//! Lists the static pages with the deploy date as `lastmod`, then every
//! document that renders on this site (link documents redirect elsewhere and
//! are left out) with its own date.
//!
//! The deploy date comes from a small JSON file written at build time:
//!
//! ```json
//! {"date": "2024-03-01"}
//! ```
//!
//! A missing or unreadable file falls back to [`EPOCH_DATE`].

use crate::content::Document;
use maud::{PreEscaped, html};
use serde::Deserialize;
use std::path::Path;

pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
pub const EPOCH_DATE: &str = "1970-01-01";

/// Routes without parameters, in the order they appear in the sitemap.
pub const STATIC_ROUTES: &[&str] = &["/", "/projects/"];

#[derive(Deserialize)]
struct BuildInfo {
    date: String,
}

/// Deploy date from a build-info file, or [`EPOCH_DATE`].
pub fn read_build_date(path: &Path) -> String {
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str::<BuildInfo>(&text).map_err(|e| e.to_string()));
    match parsed {
        Ok(info) => info.date,
        Err(e) => {
            log::debug!("no build date from {}: {e}", path.display());
            EPOCH_DATE.to_string()
        }
    }
}

/// `https://{host}`, whatever scheme the request arrived on.
pub fn base_url_from_host(host: &str) -> String {
    format!("https://{}", host.trim_end_matches('/'))
}

/// Render the sitemap document.
///
/// `base_url` has any trailing `/` removed. Link documents are skipped;
/// undated documents use `build_date`.
pub fn render_sitemap(
    base_url: &str,
    static_routes: &[&str],
    documents: &[Document],
    build_date: &str,
) -> String {
    let base = base_url.trim_end_matches('/');
    let markup = html! {
        (PreEscaped(r#"<?xml version="1.0" encoding="UTF-8"?>"#))
        urlset xmlns=(SITEMAP_NS) {
            @for route in static_routes {
                url {
                    loc { (base) (route) }
                    lastmod { (build_date) }
                }
            }
            @for doc in documents.iter().filter(|d| !d.is_link()) {
                url {
                    loc { (base) "/projects/" (doc.id()) }
                    lastmod {
                        @match doc.date() {
                            Some(date) => { (date.format("%Y-%m-%d")) }
                            None => { (build_date) }
                        }
                    }
                }
            }
        }
    };
    markup.into_string()
}
