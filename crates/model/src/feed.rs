use chrono::{DateTime, Utc};
use serde::Serialize;

/// One successful fetch of a live feed, valid until the end of its window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveFeedSnapshot<T> {
    pub fetched_at: DateTime<Utc>,
    /// `floor(fetched_at / window duration)`.
    pub window: i64,
    pub source_url: String,
    pub payload: T,
}

impl<T> LiveFeedSnapshot<T> {
    pub fn new(fetched_at: DateTime<Utc>, window: i64, source_url: String, payload: T) -> Self {
        Self {
            fetched_at,
            window,
            source_url,
            payload,
        }
    }
}
