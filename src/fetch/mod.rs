//! Document fetching
//!
//! The rest of the crate depends only on the [`Fetcher`] trait; the
//! reqwest-backed [`HttpFetcher`] is the production implementation.

mod fetcher;

pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher, HttpFetcher, RETRY_STATUSES};
