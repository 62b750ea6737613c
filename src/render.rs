//! HTML rendering.
//!
//! Every page the server returns is built here with
//! [maud](https://maud.lambda.xyz/): compile-time checked templates with
//! automatic escaping. Markdown bodies go through `pulldown-cmark` and are the
//! only pre-escaped content.
//!
//! ## Pages
//!
//! | Function | Route |
//! |---|---|
//! | [`render_home`] | `/` |
//! | [`render_listing`] | `/projects/`, `/projects/category/{id}/` |
//! | [`render_article`] | `/projects/{id}` |
//! | [`render_empty_state`] | listing routes with nothing to show |
//! | [`render_error_page`] | `/error/{code}` and the 404 fallback |
//!
//! Static assets (`static/style.css`, `static/filter.js`) are embedded at
//! compile time.

use crate::categories::Categories;
use crate::config::SiteInfo;
use crate::content::Document;
use chrono::NaiveDate;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, html as md_html};

const CSS: &str = include_str!("../static/style.css");
const FILTER_JS: &str = include_str!("../static/filter.js");

pub const EMPTY_TITLE: &str = "There's nothing here... yet.";
pub const EMPTY_DESCRIPTION: &str =
    "I'm still working on this page. Check back soon for some content.";

// ============================================================================
// Text helpers
// ============================================================================

fn markdown_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES
}

/// Convert a markdown body to HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, markdown_options());
    let mut out = String::new();
    md_html::push_html(&mut out, parser);
    out
}

/// Plain text of the body's paragraphs, whitespace-collapsed, cut to the
/// first `words` words. Headings, code blocks and tight list items are not
/// paragraphs and do not contribute.
pub fn excerpt(markdown: &str, words: usize) -> String {
    let mut text = String::new();
    let mut depth = 0usize;
    for event in Parser::new_ext(markdown, markdown_options()) {
        match event {
            Event::Start(Tag::Paragraph) => depth += 1,
            Event::End(TagEnd::Paragraph) => {
                depth = depth.saturating_sub(1);
                text.push(' ');
            }
            Event::Text(t) | Event::Code(t) if depth > 0 => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak if depth > 0 => text.push(' '),
            _ => {}
        }
    }
    text.split_whitespace()
        .take(words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `Monday 01 January 2024`.
pub fn human_date(date: NaiveDate) -> String {
    date.format("%A %d %B %Y").to_string()
}

/// Title and explanation for the friendly error pages.
pub fn error_text(code: u16) -> Option<(&'static str, &'static str)> {
    let text = match code {
        400 => ("Bad Request", "Sorry, I didn't understand your request."),
        403 => ("Forbidden", "Sorry, you aren't allowed to view this page."),
        404 => ("Page Not Found", "Sorry, that page doesn't exist."),
        418 => (
            "I'm a Teapot",
            "I can't brew coffee as I am, in fact, a teapot.",
        ),
        500 => ("Internal Server Error", "Something went wrong on my end."),
        503 => (
            "Service Temporarily Unavailable",
            "My website is experiencing some issues and will be back shortly.",
        ),
        505 => (
            "HTTP Version Not Supported",
            "Your browser tried to use a HTTP version I don't support. Check it is up to date.",
        ),
        _ => return None,
    };
    Some(text)
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, body_class: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body class=[body_class] {
                (site_header())
                (content)
            }
        }
    }
}

fn site_header() -> Markup {
    html! {
        header.site-header {
            nav.site-nav {
                a href="/" { "Home" }
                a href="/projects/" { "Projects" }
            }
        }
    }
}

fn page_title(title: &str, site: &SiteInfo) -> String {
    if title == site.title {
        title.to_string()
    } else {
        format!("{} - {}", title, site.title)
    }
}

/// Links to each of a document's categories that the index knows about.
fn category_links(doc: &Document, categories: &Categories) -> Markup {
    html! {
        span.categories {
            @for id in doc.categories() {
                @if let Some(title) = categories.title(id) {
                    a href={ "/projects/category/" (id) "/" } { (title) }
                }
            }
        }
    }
}

fn category_filter(categories: &Categories, current: Option<&str>) -> Markup {
    html! {
        div.category-filter {
            label for="filter_category" { "Filter: " }
            select id="filter_category" {
                option value="all" selected[current.is_none()] { "All" }
                @for (id, entry) in categories.iter() {
                    option value=(id) selected[current == Some(id)] { (entry.title) }
                }
            }
        }
        script { (PreEscaped(FILTER_JS)) }
    }
}

fn article_card(doc: &Document, categories: &Categories, excerpt_words: usize) -> Markup {
    let href = match doc.link() {
        Some(link) => link.to_string(),
        None => format!("/projects/{}", doc.id()),
    };
    html! {
        article.article-card {
            h2 {
                @if doc.is_link() {
                    a href=(href) target="_blank" rel="noopener" { (doc.title()) }
                } @else {
                    a href=(href) { (doc.title()) }
                }
            }
            p.card-meta {
                @if let Some(date) = doc.date() {
                    time datetime=(date.format("%Y-%m-%d")) { (human_date(date)) }
                    " "
                }
                (category_links(doc, categories))
            }
            p.excerpt { (excerpt(&doc.content, excerpt_words)) }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

pub fn render_home(site: &SiteInfo) -> Markup {
    let content = html! {
        main.home-page {
            h1 { (site.title) }
            p { (site.description) }
            p { a href="/projects/" { "Browse all projects" } }
        }
    };
    base_document(&site.title, Some("home"), content)
}

/// Input for [`render_listing`].
pub struct Listing<'a> {
    pub title: &'a str,
    pub description: &'a str,
    /// Already sorted for display.
    pub documents: &'a [Document],
    pub categories: &'a Categories,
    /// Category being filtered on, if any.
    pub current_category: Option<&'a str>,
    pub excerpt_words: usize,
}

pub fn render_listing(listing: &Listing, site: &SiteInfo) -> Markup {
    let content = html! {
        main.listing-page {
            header.listing-header {
                h1 { (listing.title) }
                p { (listing.description) }
            }
            (category_filter(listing.categories, listing.current_category))
            @for doc in listing.documents {
                (article_card(doc, listing.categories, listing.excerpt_words))
            }
        }
    };
    base_document(&page_title(listing.title, site), None, content)
}

pub fn render_article(doc: &Document, categories: &Categories, site: &SiteInfo) -> Markup {
    let content = html! {
        main.article-page {
            article {
                h1 { (doc.title()) }
                p.article-meta {
                    @if let Some(date) = doc.date() {
                        time datetime=(date.format("%Y-%m-%d")) { (human_date(date)) }
                        " "
                    }
                    (category_links(doc, categories))
                }
                div.article-body {
                    (PreEscaped(markdown_to_html(&doc.content)))
                }
            }
        }
    };
    base_document(&page_title(doc.title(), site), Some("article"), content)
}

pub fn render_empty_state() -> Markup {
    let content = html! {
        main.empty-state {
            h2 { (EMPTY_TITLE) }
            p { (EMPTY_DESCRIPTION) }
        }
    };
    base_document(EMPTY_TITLE, None, content)
}

/// Friendly page for a status code. Codes without a table entry get a bare
/// heading.
pub fn render_error_page(code: u16) -> Markup {
    let (name, description) = error_text(code).unwrap_or(("Error", ""));
    let heading = format!("{code}: {name}");
    let content = html! {
        main.error-page {
            h2 { (heading) }
            @if !description.is_empty() {
                p { (description) }
            }
            a href="/" { "Click here to return to the homepage" }
        }
    };
    base_document(&heading, Some("error"), content)
}

// ============================================================================
// Tests
// ============================================================================
