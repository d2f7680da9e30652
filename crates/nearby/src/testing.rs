use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use catalog::{CatalogError, CatalogSource, LocationCatalog, ProximityFilter};
use live_feed::{FeedRequest, FeedSource, FetchError, FetchResult};
use lta_datamall::{CarparkAvailabilityFeed, LtaCredentials};
use model::{
    carpark::CatalogEntity,
    geo::{Svy21, Wgs84},
};
use serde_json::{json, Value};
use utility::{geo::Svy21Projection, id::EntityId};

use crate::service::NearbyCarparks;

pub const LATITUDE: f64 = 1.3521;
pub const LONGITUDE: f64 = 103.8198;

struct StaticCatalog(Option<Vec<CatalogEntity>>);

impl CatalogSource for StaticCatalog {
    fn load(&self) -> catalog::CatalogResult<Vec<CatalogEntity>> {
        self.0.clone().ok_or_else(|| CatalogError::Io {
            path: "HDBCarparkInformation.csv".to_owned(),
            reason: "missing".to_owned(),
        })
    }
}

pub struct StaticFeed {
    available: bool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn get(&self, _request: &FeedRequest) -> FetchResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return Err(FetchError::Other("DataMall is down".to_owned()));
        }
        Ok(json!({
            "value": [
                { "CarParkID": "near", "LotType": "C", "AvailableLots": 42 },
                { "CarParkID": "EDGE", "LotType": "Y", "AvailableLots": 3 },
                { "CarParkID": "ELSEWHERE", "LotType": "C", "AvailableLots": 9 },
            ]
        }))
    }
}

fn entity(id: &str, dx: f64, dy: f64) -> CatalogEntity {
    let center = Wgs84::new(LATITUDE, LONGITUDE)
        .to_svy21(Svy21Projection::shared().unwrap())
        .unwrap();
    CatalogEntity {
        id: EntityId::new(id),
        position: Svy21::new(center.x + dx, center.y + dy),
        address: format!("CARPARK {}", id),
    }
}

/// A query service over four carparks 100, 300, 424 and 800 metres from
/// the test centre.
pub fn service(catalog_available: bool, feed_available: bool) -> (NearbyCarparks, Arc<StaticFeed>) {
    let entities = catalog_available.then(|| {
        vec![
            entity("FAR", 0.0, 800.0),
            entity("MID", 300.0, 0.0),
            entity("NEAR", 0.0, -100.0),
            entity("EDGE", -300.0, 300.0),
        ]
    });
    let catalog = Arc::new(LocationCatalog::new(Arc::new(StaticCatalog(entities))));
    let filter = ProximityFilter::new(catalog).unwrap();

    let feed = Arc::new(StaticFeed {
        available: feed_available,
        calls: AtomicUsize::new(0),
    });
    let availability = CarparkAvailabilityFeed::new(
        LtaCredentials::new("key"),
        feed.clone(),
        CarparkAvailabilityFeed::WINDOW,
    );
    (NearbyCarparks::new(filter, Arc::new(availability)), feed)
}
