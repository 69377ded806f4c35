//! Fetching rendered item ranges.
//!
//! A list asks its endpoint for items `first..=last` by appending
//! `&r=<first>,<last>` to its fetch URL. The response body holds one rendered
//! fragment per item, separated by blank lines; see [`decode_fragments`].
//!
//! Fetching is abstracted behind [`RangeFetcher`] so the manager can be
//! driven by HTTP ([`HttpFetcher`]) or by any in-process source
//! ([`FnFetcher`]).

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Future returned by [`RangeFetcher::fetch`].
pub type FetchFuture = Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send>>;

/// Why a range fetch failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-success status.
    #[error("request to {url} returned status {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// A custom source failed.
    #[error("{0}")]
    Source(String),
}

/// One range request.
///
/// # Examples
///
/// ```rust
/// use bubbletea_dllist::fetch::FetchRequest;
///
/// let request = FetchRequest::new("/api/search?q=cats", 32, 48);
/// assert_eq!(request.url(), "/api/search?q=cats&r=32,48");
/// assert_eq!(request.len(), 17);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// The list's base fetch URL.
    pub base: String,
    /// First item requested, inclusive.
    pub first: usize,
    /// Last item requested, inclusive.
    pub last: usize,
    /// Marks reference fetches made by the consistency checker.
    pub for_debug: bool,
}

impl FetchRequest {
    /// Creates a request for items `first..=last`.
    pub fn new(base: impl Into<String>, first: usize, last: usize) -> Self {
        Self {
            base: base.into(),
            first,
            last,
            for_debug: false,
        }
    }

    /// Number of items requested.
    pub fn len(&self) -> usize {
        self.last + 1 - self.first
    }

    /// Always `false`: a request names at least one item.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The full URL to request.
    pub fn url(&self) -> String {
        let mut url = format!("{}&r={},{}", self.base, self.first, self.last);
        if self.for_debug {
            url.push_str("&FOR_DEBUG=yes");
        }
        url
    }
}

impl fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Splits a response body into item fragments.
///
/// Fragments are separated by one or more blank lines. Whitespace between
/// fragments is ignored; a fragment keeps its internal line breaks.
///
/// # Examples
///
/// ```rust
/// use bubbletea_dllist::fetch::decode_fragments;
///
/// let items = decode_fragments("alpha\n\nbeta\nsecond line\n\n\n gamma \n");
/// assert_eq!(items, vec!["alpha", "beta\nsecond line", " gamma"]);
/// ```
pub fn decode_fragments(body: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in body.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                items.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        items.push(current.join("\n"));
    }
    items
}

/// Fetches rendered ranges for the manager.
///
/// Implementations must be cheap to call; the returned future does the work
/// and is driven by the bubbletea runtime.
pub trait RangeFetcher: Send + Sync {
    /// Starts fetching `request`, resolving to the raw response body.
    fn fetch(&self, request: FetchRequest) -> FetchFuture;
}

/// Fetches ranges over HTTP with `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher sharing an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl RangeFetcher for HttpFetcher {
    fn fetch(&self, request: FetchRequest) -> FetchFuture {
        let client = self.client.clone();
        Box::pin(async move {
            let url = request.url();
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|source| FetchError::Transport {
                    url: url.clone(),
                    source,
                })?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url,
                    status: status.as_u16(),
                });
            }
            response
                .text()
                .await
                .map_err(|source| FetchError::Transport { url, source })
        })
    }
}

/// Serves ranges from a synchronous closure.
///
/// # Examples
///
/// ```rust
/// use bubbletea_dllist::fetch::{FetchRequest, FnFetcher};
///
/// let fetcher = FnFetcher::new(|request: &FetchRequest| {
///     Ok((request.first..=request.last)
///         .map(|i| format!("item {i}"))
///         .collect::<Vec<_>>()
///         .join("\n\n"))
/// });
/// # let _ = fetcher;
/// ```
#[derive(Clone)]
pub struct FnFetcher {
    source: Arc<dyn Fn(&FetchRequest) -> Result<String, FetchError> + Send + Sync>,
}

impl FnFetcher {
    /// Wraps `source`.
    pub fn new<F>(source: F) -> Self
    where
        F: Fn(&FetchRequest) -> Result<String, FetchError> + Send + Sync + 'static,
    {
        Self {
            source: Arc::new(source),
        }
    }
}

impl fmt::Debug for FnFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFetcher").finish_non_exhaustive()
    }
}

impl RangeFetcher for FnFetcher {
    fn fetch(&self, request: FetchRequest) -> FetchFuture {
        let result = (self.source)(&request);
        Box::pin(std::future::ready(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_request_url() {
        let mut request = FetchRequest::new("/list?id=4", 0, 99);
        request.for_debug = true;
        assert_eq!(request.url(), "/list?id=4&r=0,99&FOR_DEBUG=yes");
        assert_eq!(request.to_string(), request.url());
    }

    #[test]
    fn test_decode_ignores_surrounding_whitespace() {
        assert!(decode_fragments("").is_empty());
        assert!(decode_fragments("\n \n\t\n").is_empty());
        assert_eq!(decode_fragments("\n\none\n\n"), vec!["one"]);
    }

    #[test]
    fn test_decode_keeps_multiline_fragments() {
        let items = decode_fragments("a1\na2\n\nb1\nb2\n");
        assert_eq!(items, vec!["a1\na2", "b1\nb2"]);
    }

    #[tokio::test]
    async fn test_fn_fetcher_resolves_immediately() {
        let fetcher = FnFetcher::new(|request: &FetchRequest| {
            Ok(format!("{}-{}", request.first, request.last))
        });
        let body = fetcher.fetch(FetchRequest::new("/x?", 3, 5)).await.unwrap();
        assert_eq!(body, "3-5");
    }

    #[tokio::test]
    async fn test_fn_fetcher_propagates_errors() {
        let fetcher = FnFetcher::new(|_: &FetchRequest| Err(FetchError::Source("offline".into())));
        let err = fetcher.fetch(FetchRequest::new("/x?", 0, 1)).await.unwrap_err();
        assert_eq!(err.to_string(), "offline");
    }
}
