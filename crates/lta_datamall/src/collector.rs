use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use live_feed::{
    collector::{Collector, Continuation},
    FetchError,
};

use crate::carparks::CarparkAvailabilityFeed;

/// Refreshes the carpark availability cache at the start of every cache
/// window, so that user queries rarely wait for DataMall.
pub struct AvailabilityCollector {
    feed: Arc<CarparkAvailabilityFeed>,
}

impl AvailabilityCollector {
    pub fn new(feed: Arc<CarparkAvailabilityFeed>) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl Collector for AvailabilityCollector {
    type Error = FetchError;

    fn name(&self) -> &str {
        "carpark availability"
    }

    async fn run(&mut self) -> Result<Continuation, Self::Error> {
        let availability = self.feed.try_availability().await?;
        log::debug!("Live availability for {} carparks.", availability.len());
        Ok(Continuation::ContinueAfter(self.feed.cache().until_next_window()))
    }

    fn tick(&self) -> Option<Duration> {
        Some(self.feed.cache().window())
    }
}
