//! HTTP surface.
//!
//! An axum [`Router`] over an owned [`AppState`]: the content repository, the
//! thumbnail cache and the storage they share are built once at startup and
//! handed to every handler. Nothing lives in globals, so tests build a state
//! over in-memory storage and drive the router directly.
//!
//! ## Routes
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /` | homepage |
//! | `GET /projects/` | sorted listing of live documents |
//! | `GET /projects/category/{id}/` | listing filtered to one category |
//! | `GET /projects/{id}` | one article, or a 302 to its `link` |
//! | `GET /projects/image/{name}?w=&h=` | bounded thumbnail |
//! | `GET /sitemap.xml` | sitemap |
//! | `GET /error/{code}` | friendly error page |
//!
//! Repository and thumbnail work is blocking file IO and runs on tokio's
//! blocking pool. Content is re-read on every request.

use crate::categories::{Categories, CategoryError, CategoryIndex};
use crate::config::{SiteConfig, SiteInfo};
use crate::content::{ContentError, ContentRepository, sorted_listing};
use crate::imaging::{ImageBackend, Quality};
use crate::render::{self, Listing};
use crate::sitemap::{STATIC_ROUTES, base_url_from_host, read_build_date, render_sitemap};
use crate::storage::Storage;
use crate::thumbnail::{ThumbnailCache, ThumbnailError};
use axum::Router;
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use chrono::NaiveDate;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Category(#[from] CategoryError),
    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found")]
    NotFound,
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SiteError {
    fn status(&self) -> StatusCode {
        match self {
            SiteError::Content(ContentError::NotFound(_))
            | SiteError::Thumbnail(ThumbnailError::NotFound(_))
            | SiteError::NotFound => StatusCode::NOT_FOUND,
            SiteError::Category(CategoryError::ConfigurationMissing) => StatusCode::OK,
            SiteError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SiteError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::OK {
            return Html(render::render_empty_state().into_string()).into_response();
        }
        if status.is_server_error() {
            log::error!("{self}");
        } else {
            log::debug!("{status}: {self}");
        }
        (
            status,
            Html(render::render_error_page(status.as_u16()).into_string()),
        )
            .into_response()
    }
}

/// Everything a request handler needs.
pub struct AppState {
    pub repo: ContentRepository,
    pub storage: Arc<dyn Storage>,
    pub thumbnails: ThumbnailCache,
    pub site: SiteInfo,
    pub excerpt_words: usize,
    /// Build-info JSON for the sitemap's `lastmod`.
    pub build_info: PathBuf,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn Storage>,
        backend: Arc<dyn ImageBackend>,
        config: &SiteConfig,
        build_info: PathBuf,
    ) -> Self {
        Self {
            repo: ContentRepository::new(storage.clone()),
            thumbnails: ThumbnailCache::new(storage.clone(), backend)
                .with_quality(Quality::new(config.images.quality)),
            storage,
            site: config.site.clone(),
            excerpt_words: config.listing.excerpt_words,
            build_info,
        }
    }

    /// Pin "today" for publish-date filtering.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.repo = self.repo.with_today(today);
        self
    }

    /// Category index; a missing `categories.json` is an empty index here.
    fn categories_or_empty(&self) -> Result<Categories, SiteError> {
        match CategoryIndex::load(self.storage.as_ref()) {
            Ok(categories) => Ok(categories),
            Err(CategoryError::ConfigurationMissing) => Ok(Categories::default()),
            Err(e) => Err(e.into()),
        }
    }
}

type SharedState = Arc<AppState>;

/// Run `f` on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, SiteError>
where
    F: FnOnce() -> Result<T, SiteError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/projects", get(|| async { Redirect::permanent("/projects/") }))
        .route("/projects/", get(listing))
        .route("/projects/category/{id}/", get(category))
        .route("/projects/image/{name}", get(image))
        .route("/projects/{id}", get(article))
        .route("/sitemap.xml", get(sitemap))
        .route("/error/{code}", get(error_page))
        .fallback(not_found)
        .layer(middleware::from_fn(log_requests))
        .with_state(Arc::new(state))
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn run(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("shutting down");
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;
    log::debug!("{method} {uri} -> {}", response.status());
    response
}

// ============================================================================
// Handlers
// ============================================================================

async fn home(State(state): State<SharedState>) -> Html<String> {
    Html(render::render_home(&state.site).into_string())
}

async fn listing(State(state): State<SharedState>) -> Result<Html<String>, SiteError> {
    blocking(move || {
        let documents = state.repo.list_live()?;
        if documents.is_empty() {
            return Ok(render::render_empty_state().into_string());
        }
        let categories = CategoryIndex::load(state.storage.as_ref())?;
        let documents = sorted_listing(documents);
        let page = Listing {
            title: &state.site.title,
            description: &state.site.description,
            documents: &documents,
            categories: &categories,
            current_category: None,
            excerpt_words: state.excerpt_words,
        };
        Ok(render::render_listing(&page, &state.site).into_string())
    })
    .await
    .map(Html)
}

async fn category(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Html<String>, SiteError> {
    blocking(move || {
        let categories = CategoryIndex::load(state.storage.as_ref())?;
        let entry = categories.resolve(&id).ok_or(SiteError::NotFound)?;
        let documents = state.repo.find_by_meta_key("categories", &id)?;
        if documents.is_empty() {
            return Ok(render::render_empty_state().into_string());
        }
        let documents = sorted_listing(documents);
        let page = Listing {
            title: &entry.title,
            description: &entry.long_description,
            documents: &documents,
            categories: &categories,
            current_category: Some(id.as_str()),
            excerpt_words: state.excerpt_words,
        };
        Ok(render::render_listing(&page, &state.site).into_string())
    })
    .await
    .map(Html)
}

async fn article(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Response, SiteError> {
    blocking(move || {
        let doc = state.repo.resolve_article(&id)?;
        if let Some(link) = doc.link() {
            return Ok((StatusCode::FOUND, [(header::LOCATION, link.to_string())]).into_response());
        }
        let categories = state.categories_or_empty()?;
        Ok(Html(render::render_article(&doc, &categories, &state.site).into_string()).into_response())
    })
    .await
}

#[derive(Deserialize)]
struct ImageQuery {
    w: Option<String>,
    h: Option<String>,
}

/// A missing or empty bound is `0` (unconstrained).
fn parse_bound(name: &str, raw: Option<&str>) -> Result<u32, SiteError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(0),
        Some(value) => value
            .parse()
            .map_err(|_| SiteError::BadRequest(format!("{name}={value:?} is not a pixel count"))),
    }
}

/// Strong ETag over the response body.
pub fn etag_for(bytes: &[u8]) -> String {
    format!("\"{:x}\"", Sha256::digest(bytes))
}

async fn image(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(query): Query<ImageQuery>,
    headers: HeaderMap,
) -> Result<Response, SiteError> {
    let width = parse_bound("w", query.w.as_deref())?;
    let height = parse_bound("h", query.h.as_deref())?;

    let thumb = blocking(move || Ok(state.thumbnails.serve(&name, width, height)?)).await?;
    let etag = etag_for(&thumb.bytes);

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|tag| tag.trim() == etag));
    if not_modified {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
    }

    Ok((
        [
            (header::CONTENT_TYPE, thumb.content_type),
            (header::ETAG, etag),
        ],
        thumb.bytes,
    )
        .into_response())
}

async fn sitemap(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Response, SiteError> {
    let base_url = if state.site.base_url.is_empty() {
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| SiteError::BadRequest("no Host header".to_string()))?;
        base_url_from_host(host)
    } else {
        state.site.base_url.clone()
    };

    let xml = blocking(move || {
        let documents = sorted_listing(state.repo.list_live()?);
        let build_date = read_build_date(&state.build_info);
        Ok(render_sitemap(&base_url, STATIC_ROUTES, &documents, &build_date))
    })
    .await?;

    Ok(([(header::CONTENT_TYPE, "application/xml")], xml).into_response())
}

async fn error_page(Path(code): Path<String>) -> Response {
    match code.parse::<u16>() {
        Ok(code) if render::error_text(code).is_some() => {
            Html(render::render_error_page(code).into_string()).into_response()
        }
        Ok(code) => match StatusCode::from_u16(code) {
            Ok(status) => status.into_response(),
            Err(_) => Html(render::render_error_page(400).into_string()).into_response(),
        },
        Err(_) => Html(render::render_error_page(400).into_string()).into_response(),
    }
}

async fn not_found() -> SiteError {
    SiteError::NotFound
}
