use std::sync::Arc;

use thiserror::Error;

pub mod cache;
pub mod clock;
pub mod collector;
pub mod pool;
pub mod source;

pub use cache::WindowedFetchCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use source::{FeedSource, HttpFeedSource};

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("HTTP request error: {0}")]
    Request(Arc<reqwest::Error>),
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("invalid response ({status_code}) from {url}")]
    InvalidResponse {
        status_code: reqwest::StatusCode,
        url: String,
        response: Option<String>,
    },
    #[error("JSON parse error: {0}")]
    Json(Arc<serde_json::Error>),
    #[error("invalid url '{0}'")]
    InvalidUrl(String),
    #[error("worker pool is closed")]
    PoolClosed,
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        match e.url() {
            Some(url) if e.is_timeout() => FetchError::Timeout {
                url: url.to_string(),
            },
            _ => FetchError::Request(Arc::new(e)),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Json(Arc::new(e))
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

/// A GET request against a live feed.
///
/// Headers are not part of the cache key; two requests for the same URL
/// and query share one cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    url: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
}

impl FeedRequest {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            query: vec![],
            headers: vec![],
        }
    }

    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn url(&self) -> FetchResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.url)
            .map_err(|_| FetchError::InvalidUrl(self.url.clone()))?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }

    /// The full URL including query parameters.
    pub fn cache_key(&self) -> String {
        match self.url() {
            Ok(url) => url.to_string(),
            Err(_) => self.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_includes_query_but_not_headers() {
        let plain = FeedRequest::new("https://example.org/BusArrival")
            .query("BusStopCode", "83139")
            .header("AccountKey", "secret");
        let other_key = FeedRequest::new("https://example.org/BusArrival")
            .query("BusStopCode", "83139")
            .header("AccountKey", "different");
        let other_stop = FeedRequest::new("https://example.org/BusArrival")
            .query("BusStopCode", "01012");

        assert_eq!(
            plain.cache_key(),
            "https://example.org/BusArrival?BusStopCode=83139"
        );
        assert_eq!(plain.cache_key(), other_key.cache_key());
        assert_ne!(plain.cache_key(), other_stop.cache_key());
    }

    #[test]
    fn requests_without_query_keep_their_url() {
        let request = FeedRequest::new("https://example.org/feed");
        assert_eq!(request.url().unwrap().as_str(), "https://example.org/feed");
        assert_eq!(request.cache_key(), "https://example.org/feed");
    }

    #[test]
    fn invalid_urls_are_reported() {
        let request = FeedRequest::new("not a url");
        assert!(matches!(request.url(), Err(FetchError::InvalidUrl(_))));
        assert_eq!(request.cache_key(), "not a url");
    }
}
