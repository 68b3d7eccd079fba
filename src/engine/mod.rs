//! Image resolution engine
//!
//! Orchestrates one lookup against the network: fetch the page, parse it,
//! run the strategy chain. The engine holds no mutable state; concurrent
//! resolutions share only the fetcher's connection pool.

mod telemetry;

pub use telemetry::{StrategyTiming, Telemetry};

use crate::config::RequestConfig;
use crate::extract::{ChainReport, Document, ExtractionResult, StrategyChain};
use crate::fetch::{FetchError, Fetcher, HttpFetcher};
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// Logs at info when diagnostics were requested, at debug otherwise
macro_rules! diagnostic {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            tracing::info!($($arg)+);
        } else {
            tracing::debug!($($arg)+);
        }
    };
}

/// Per-call switches for `resolve`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Raise per-stage diagnostics to info level
    pub debug: bool,
    /// Record stage and strategy durations
    pub profile: bool,
}

/// Everything a resolution produced
#[derive(Debug)]
pub struct Resolution {
    pub result: ExtractionResult,
    /// Strategy that produced the result
    pub matched_strategy: Option<&'static str>,
    /// Set when the page could not be fetched; `result` is then `NotFound`
    pub fetch_error: Option<FetchError>,
    /// Present when profiling was requested
    pub telemetry: Option<Telemetry>,
}

impl Resolution {
    pub fn image_url(&self) -> Option<&str> {
        self.result.image_url()
    }
}

/// Fetch → parse → strategy chain
pub struct ResolutionEngine<F = HttpFetcher> {
    fetcher: F,
    chain: StrategyChain,
}

impl ResolutionEngine<HttpFetcher> {
    /// Creates an engine with the HTTP fetcher and the default chain
    pub fn from_config(config: &RequestConfig) -> Result<Self, FetchError> {
        Ok(Self::new(HttpFetcher::new(config)?))
    }
}

impl<F: Fetcher> ResolutionEngine<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_chain(fetcher, StrategyChain::default())
    }

    pub fn with_chain(fetcher: F, chain: StrategyChain) -> Self {
        Self { fetcher, chain }
    }

    /// Resolves the cover image of a page
    ///
    /// Never fails: fetch errors are reported in `Resolution::fetch_error`
    /// with a `NotFound` result, and a fault while parsing or extracting
    /// also yields `NotFound`.
    ///
    /// # Arguments
    ///
    /// * `page_url` - The product page, used verbatim
    /// * `options` - Diagnostics and profiling switches
    pub async fn resolve(&self, page_url: &str, options: ResolveOptions) -> Resolution {
        let started = Instant::now();

        let fetch_started = Instant::now();
        let fetched = self.fetcher.fetch(page_url).await;
        let fetch_elapsed = fetch_started.elapsed();

        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(page_url, error = %e, "Failed to fetch page");
                let telemetry = options.profile.then(|| Telemetry {
                    fetch: fetch_elapsed,
                    parse: None,
                    strategies: Vec::new(),
                    total: started.elapsed(),
                });
                if let Some(telemetry) = &telemetry {
                    telemetry.log(page_url);
                }
                return Resolution {
                    result: ExtractionResult::NotFound,
                    matched_strategy: None,
                    fetch_error: Some(e),
                    telemetry,
                };
            }
        };

        diagnostic!(
            options.debug,
            page_url,
            status = page.status,
            final_url = %page.final_url,
            bytes = page.body.len(),
            "Fetched page"
        );

        let (report, parse_elapsed) = match self.extract(&page.body, options) {
            Some(extracted) => extracted,
            None => (
                ChainReport {
                    result: ExtractionResult::NotFound,
                    matched: None,
                    timings: Vec::new(),
                },
                None,
            ),
        };

        diagnostic!(
            options.debug,
            page_url,
            strategy = report.matched,
            found = report.result.is_found(),
            "Strategy chain finished"
        );

        let telemetry = options.profile.then(|| Telemetry {
            fetch: fetch_elapsed,
            parse: parse_elapsed,
            strategies: report
                .timings
                .iter()
                .map(|&(strategy, seconds)| StrategyTiming { strategy, seconds })
                .collect(),
            total: started.elapsed(),
        });
        if let Some(telemetry) = &telemetry {
            telemetry.log(page_url);
        }

        Resolution {
            result: report.result,
            matched_strategy: report.matched,
            fetch_error: None,
            telemetry,
        }
    }

    /// Parses markup and runs the chain; `None` if a strategy panicked
    ///
    /// Parser panics are absorbed inside `Document::parse`, which falls back
    /// to a fragment or empty document. Only the chain is guarded here.
    fn extract(
        &self,
        markup: &str,
        options: ResolveOptions,
    ) -> Option<(ChainReport, Option<Duration>)> {
        let parse_started = Instant::now();
        let doc = Document::parse(markup);
        let parse_elapsed = parse_started.elapsed();

        if doc.is_degraded() {
            diagnostic!(options.debug, mode = ?doc.mode(), "Markup needed error recovery");
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.chain.run(&doc, options.profile))) {
            Ok(report) => Some((report, Some(parse_elapsed))),
            Err(_) => {
                tracing::error!("Strategy chain panicked; treating page as not found");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Strategy, StrategyFault};
    use crate::fetch::FetchedPage;
    use async_trait::async_trait;

    const COVER: &str = "https://m.media-amazon.com/images/I/abc._SX300_SY400_.jpg";

    /// Fetcher serving a fixed body, or failing with a fixed status
    enum StaticFetcher {
        Body(String),
        Status(u16),
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            match self {
                Self::Body(body) => Ok(FetchedPage {
                    final_url: url.to_string(),
                    status: 200,
                    body: body.clone(),
                }),
                Self::Status(status) => Err(FetchError::Status {
                    url: url.to_string(),
                    status: *status,
                }),
            }
        }
    }

    fn primary_block_page() -> String {
        format!(
            r#"<html><body><img id="imgBlkFront" data-a-dynamic-image='{{"{}":[300,400]}}'></body></html>"#,
            COVER
        )
    }

    #[tokio::test]
    async fn test_resolve_found() {
        let engine = ResolutionEngine::new(StaticFetcher::Body(primary_block_page()));
        let resolution = engine
            .resolve("https://www.amazon.com/dp/1", ResolveOptions::default())
            .await;

        assert_eq!(resolution.image_url(), Some(COVER));
        assert_eq!(resolution.matched_strategy, Some("primary_image_block"));
        assert!(resolution.fetch_error.is_none());
        assert!(resolution.telemetry.is_none());
    }

    #[tokio::test]
    async fn test_resolve_not_found_without_matches() {
        let engine = ResolutionEngine::new(StaticFetcher::Body(
            "<html><body><p>No images here</p></body></html>".to_string(),
        ));
        let resolution = engine
            .resolve("https://www.amazon.com/dp/2", ResolveOptions::default())
            .await;

        assert_eq!(resolution.result, ExtractionResult::NotFound);
        assert!(resolution.fetch_error.is_none());
    }

    #[tokio::test]
    async fn test_resolve_garbage_markup() {
        let engine = ResolutionEngine::new(StaticFetcher::Body("\u{0}<<>>&&</".to_string()));
        let resolution = engine
            .resolve("https://www.amazon.com/dp/3", ResolveOptions::default())
            .await;

        assert_eq!(resolution.result, ExtractionResult::NotFound);
    }

    #[tokio::test]
    async fn test_resolve_surfaces_fetch_error() {
        let engine = ResolutionEngine::new(StaticFetcher::Status(503));
        let resolution = engine
            .resolve(
                "https://www.amazon.com/dp/4",
                ResolveOptions {
                    debug: true,
                    profile: true,
                },
            )
            .await;

        assert_eq!(resolution.result, ExtractionResult::NotFound);
        assert!(matches!(
            resolution.fetch_error,
            Some(FetchError::Status { status: 503, .. })
        ));
        let telemetry = resolution.telemetry.unwrap();
        assert!(telemetry.parse.is_none());
        assert!(telemetry.strategies.is_empty());
    }

    #[tokio::test]
    async fn test_profile_records_every_evaluated_strategy() {
        let engine = ResolutionEngine::new(StaticFetcher::Body("<html></html>".to_string()));
        let resolution = engine
            .resolve(
                "https://www.amazon.com/dp/5",
                ResolveOptions {
                    debug: false,
                    profile: true,
                },
            )
            .await;

        let telemetry = resolution.telemetry.unwrap();
        assert!(telemetry.parse.is_some());
        assert_eq!(telemetry.strategies.len(), 7);
        assert_eq!(telemetry.strategies[0].strategy, "primary_image_block");
        assert!(telemetry.total >= telemetry.fetch);
    }

    struct Panicking;

    impl Strategy for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn find(&self, _doc: &Document) -> Result<Option<String>, StrategyFault> {
            panic!("strategy bug")
        }
    }

    #[tokio::test]
    async fn test_panicking_strategy_yields_not_found() {
        let engine = ResolutionEngine::with_chain(
            StaticFetcher::Body(primary_block_page()),
            StrategyChain::new(vec![Box::new(Panicking)]),
        );
        let resolution = engine
            .resolve("https://www.amazon.com/dp/7", ResolveOptions::default())
            .await;

        assert_eq!(resolution.result, ExtractionResult::NotFound);
        assert!(resolution.matched_strategy.is_none());
        assert!(resolution.fetch_error.is_none());
    }

    #[tokio::test]
    async fn test_profile_stops_at_match() {
        let engine = ResolutionEngine::new(StaticFetcher::Body(primary_block_page()));
        let resolution = engine
            .resolve(
                "https://www.amazon.com/dp/6",
                ResolveOptions {
                    debug: false,
                    profile: true,
                },
            )
            .await;

        assert_eq!(resolution.telemetry.unwrap().strategies.len(), 1);
    }
}
