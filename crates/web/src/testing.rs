use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use catalog::{CatalogResult, CatalogSource};
use live_feed::{FeedRequest, FeedSource, FetchError, FetchResult};
use model::{
    carpark::CatalogEntity,
    geo::{Svy21, Wgs84},
};
use serde_json::{json, Value};
use utility::{geo::Svy21Projection, id::EntityId};

use crate::{config::Config, WebState};

pub const LATITUDE: f64 = 1.3521;
pub const LONGITUDE: f64 = 103.8198;

struct StaticCatalog;

impl CatalogSource for StaticCatalog {
    fn load(&self) -> CatalogResult<Vec<CatalogEntity>> {
        let center = Wgs84::new(LATITUDE, LONGITUDE)
            .to_svy21(Svy21Projection::shared().unwrap())
            .unwrap();
        Ok([("NEAR", 0.0, -100.0), ("MID", 300.0, 0.0), ("FAR", 0.0, 800.0)]
            .into_iter()
            .map(|(id, dx, dy)| CatalogEntity {
                id: EntityId::new(id),
                position: Svy21::new(center.x + dx, center.y + dy),
                address: format!("CARPARK {}", id),
            })
            .collect())
    }
}

/// Answers both DataMall endpoints, or fails every request.
pub struct StaticFeed {
    available: bool,
    first_call_delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl StaticFeed {
    pub fn new(available: bool) -> Self {
        Self {
            available,
            first_call_delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Holds back the answer to the first request only.
    pub fn with_first_call_delay(mut self, delay: Duration) -> Self {
        self.first_call_delay = Some(delay);
        self
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn get(&self, request: &FeedRequest) -> FetchResult<Value> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.first_call_delay.filter(|_| call == 0) {
            tokio::time::sleep(delay).await;
        }
        if !self.available {
            return Err(FetchError::Other("DataMall is down".to_owned()));
        }
        if request.cache_key().contains("BusArrival") {
            return Ok(json!({
                "BusStopCode": "83139",
                "Services": [
                    { "ServiceNo": "21", "Operator": "SBST" },
                    { "ServiceNo": "15", "Operator": "GAS" },
                ],
            }));
        }
        Ok(json!({
            "value": [
                { "CarParkID": "NEAR", "LotType": "C", "AvailableLots": 42 },
                { "CarParkID": "MID", "LotType": "Y", "AvailableLots": 3 },
            ]
        }))
    }
}

pub fn state(feed_available: bool) -> (WebState, Arc<StaticFeed>) {
    state_with(StaticFeed::new(feed_available))
}

pub fn state_with(feed: StaticFeed) -> (WebState, Arc<StaticFeed>) {
    let config = Config::from_lookup(|name| (name == "LTA_API_KEY").then(|| "key".to_owned()))
        .unwrap();
    let feed = Arc::new(feed);
    let state = WebState::with_sources(&config, Arc::new(StaticCatalog), feed.clone()).unwrap();
    (state, feed)
}
