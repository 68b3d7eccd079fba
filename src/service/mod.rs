//! Caller-facing lookup
//!
//! Checks the request, consults the cache, resolves on a miss, writes
//! found images back, and shapes the response the API exposes.

use crate::cache::{CacheBackend, CacheStore};
use crate::config::Config;
use crate::engine::{ResolutionEngine, ResolveOptions, Telemetry};
use crate::extract::is_valid_image_url;
use crate::fetch::{Fetcher, HttpFetcher};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

pub const MISSING_URL_ERROR: &str = "Missing book URL parameter";
pub const UNSUPPORTED_URL_ERROR: &str = "Only Amazon book URLs are supported";
pub const NOT_FOUND_ERROR: &str = "Could not find book cover image";

/// Outcome class of a lookup, mapped onto HTTP status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStatus {
    Ok,
    BadRequest,
    NotFound,
    Internal,
}

impl LookupStatus {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }
}

/// Response of a single lookup
#[derive(Debug, Clone, Serialize)]
pub struct LookupResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub book_url: Option<String>,

    /// Wall-clock time of the whole lookup, rounded to milliseconds
    pub processing_time_seconds: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_backend: Option<CacheBackend>,

    /// Matching strategy, reported when diagnostics were requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<&'static str>,

    /// Stage timings, reported when profiling was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timings: Option<Telemetry>,

    #[serde(skip)]
    pub status: LookupStatus,
}

impl LookupResponse {
    fn failure(status: LookupStatus, error: String, book_url: Option<&str>, started: Instant) -> Self {
        Self {
            success: false,
            image_url: None,
            error: Some(error),
            book_url: book_url.map(str::to_string),
            processing_time_seconds: elapsed_seconds(started),
            cached: None,
            cache_backend: None,
            strategy: None,
            timings: None,
            status,
        }
    }

    fn found(image_url: String, book_url: &str, cached: bool, backend: CacheBackend, started: Instant) -> Self {
        Self {
            success: true,
            image_url: Some(image_url),
            error: None,
            book_url: Some(book_url.to_string()),
            processing_time_seconds: elapsed_seconds(started),
            cached: Some(cached),
            cache_backend: Some(backend),
            strategy: None,
            timings: None,
            status: LookupStatus::Ok,
        }
    }
}

fn elapsed_seconds(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 1_000.0).round() / 1_000.0
}

/// Cache-fronted cover lookup
pub struct LookupService<F = HttpFetcher> {
    engine: ResolutionEngine<F>,
    cache: Arc<CacheStore>,
}

impl LookupService<HttpFetcher> {
    /// Builds the HTTP engine and connects the cache from configuration
    pub async fn from_config(config: &Config) -> crate::Result<Self> {
        let engine = ResolutionEngine::from_config(&config.request)?;
        let cache = Arc::new(CacheStore::connect(&config.cache).await);
        Ok(Self::new(engine, cache))
    }
}

impl<F: Fetcher> LookupService<F> {
    pub fn new(engine: ResolutionEngine<F>, cache: Arc<CacheStore>) -> Self {
        Self { engine, cache }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Looks up the cover image for a book page
    ///
    /// # Arguments
    ///
    /// * `book_url` - The product page, used verbatim; `None` or blank models a missing parameter
    /// * `options` - Diagnostics and profiling switches for the resolution
    ///
    /// # Returns
    ///
    /// A response whose `status` is `BadRequest` for missing or non-Amazon
    /// URLs, `NotFound` when no image could be resolved, `Internal` when the
    /// cache backend fails at read time, `Ok` otherwise. A failed cache write
    /// is logged and does not fail a resolved lookup.
    pub async fn lookup(&self, book_url: Option<&str>, options: ResolveOptions) -> LookupResponse {
        let started = Instant::now();

        let book_url = match book_url.filter(|url| !url.trim().is_empty()) {
            Some(url) => url,
            None => {
                return LookupResponse::failure(
                    LookupStatus::BadRequest,
                    MISSING_URL_ERROR.to_string(),
                    book_url,
                    started,
                )
            }
        };

        if !book_url.to_lowercase().contains("amazon") {
            return LookupResponse::failure(
                LookupStatus::BadRequest,
                UNSUPPORTED_URL_ERROR.to_string(),
                Some(book_url),
                started,
            );
        }

        match self.cache.get(book_url).await {
            Ok(Some(image_url)) => {
                tracing::info!(book_url, backend = %self.cache.backend(), "Cache hit");
                return LookupResponse::found(image_url, book_url, true, self.cache.backend(), started);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(book_url, backend = %self.cache.backend(), error = %e, "Cache read failed");
                return LookupResponse::failure(
                    LookupStatus::Internal,
                    e.to_string(),
                    Some(book_url),
                    started,
                );
            }
        }

        let resolution = self.engine.resolve(book_url, options).await;

        let mut response = match resolution.image_url() {
            Some(image_url) if is_valid_image_url(image_url) => {
                match self.cache.set(book_url, image_url).await {
                    Ok(()) => tracing::info!(book_url, backend = %self.cache.backend(), "Cached image"),
                    Err(e) => tracing::error!(book_url, error = %e, "Failed to cache image"),
                }
                LookupResponse::found(
                    image_url.to_string(),
                    book_url,
                    false,
                    self.cache.backend(),
                    started,
                )
            }
            _ => {
                let error = match &resolution.fetch_error {
                    Some(e) => format!("{}: {}", NOT_FOUND_ERROR, e),
                    None => NOT_FOUND_ERROR.to_string(),
                };
                LookupResponse::failure(LookupStatus::NotFound, error, Some(book_url), started)
            }
        };

        if options.debug {
            response.strategy = resolution.matched_strategy;
        }
        response.timings = resolution.telemetry;
        response
    }
}
