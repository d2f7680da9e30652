use std::fmt;

use live_feed::FeedRequest;

/// DataMall account key, sent as the `AccountKey` header.
#[derive(Clone)]
pub struct LtaCredentials {
    account_key: String,
}

impl LtaCredentials {
    pub fn new<S: Into<String>>(account_key: S) -> Self {
        Self {
            account_key: account_key.into(),
        }
    }

    /// A request to a DataMall endpoint carrying the account key.
    pub fn request(&self, url: &str) -> FeedRequest {
        FeedRequest::new(url)
            .header("AccountKey", &self.account_key)
            .header("accept", "application/json")
    }
}

impl fmt::Debug for LtaCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LtaCredentials")
            .field("account_key", &"<redacted>")
            .finish()
    }
}
