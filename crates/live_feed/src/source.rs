use std::time::Duration;

use async_trait::async_trait;

use crate::{pool::WorkerPool, FeedRequest, FetchError, FetchResult};

/// Something a live feed can be read from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn get(&self, request: &FeedRequest) -> FetchResult<serde_json::Value>;
}

/// Reads feeds over HTTP, at most `pool.size()` requests at a time.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
    pool: WorkerPool,
}

impl HttpFeedSource {
    pub fn new(timeout: Duration, pool: WorkerPool) -> FetchResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        log::debug!(
            "HTTP feeds: {:?} timeout, {} requests in flight.",
            timeout,
            pool.size()
        );
        Ok(Self { client, pool })
    }

    async fn send(&self, request: &FeedRequest) -> FetchResult<serde_json::Value> {
        let url = request.url()?;
        log::debug!("Requesting '{}'.", url);

        let mut builder = self.client.get(url.clone());
        for (key, value) in request.headers() {
            builder = builder.header(key, value);
        }
        let response = builder.send().await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            other => Err(FetchError::InvalidResponse {
                status_code: other,
                url: url.to_string(),
                response: response.text().await.ok(),
            }),
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn get(&self, request: &FeedRequest) -> FetchResult<serde_json::Value> {
        self.pool.run(self.send(request)).await?
    }
}
