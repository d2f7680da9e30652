use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use live_feed::{Clock, FeedRequest, FeedSource, FetchError, FetchResult, WindowedFetchCache};
use model::{
    bus_arrival::{ArrivalEta, BusArrivals, BusLoad, BusService, DeckType, UpcomingBus},
    geo::Wgs84,
};

use crate::{
    client::LtaCredentials,
    data_model::bus_arrival::{BusArrivalResponse, NextBusRow},
    BUS_ARRIVAL_URL,
};

/// Bus arrivals per stop, fetched at most once per stop and window.
pub struct BusArrivalFeed {
    cache: WindowedFetchCache<BusArrivalResponse>,
    credentials: LtaCredentials,
}

impl BusArrivalFeed {
    pub const WINDOW: Duration = Duration::from_secs(60);

    pub fn new(credentials: LtaCredentials, source: Arc<dyn FeedSource>, window: Duration) -> Self {
        Self {
            cache: WindowedFetchCache::new("bus arrivals", window, source),
            credentials,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.cache = self.cache.with_clock(clock);
        self
    }

    fn request(&self, bus_stop_code: &str) -> FeedRequest {
        self.credentials
            .request(BUS_ARRIVAL_URL)
            .query("BusStopCode", bus_stop_code)
    }

    pub async fn arrivals(&self, bus_stop_code: &str) -> Option<BusArrivals> {
        match self.try_arrivals(bus_stop_code).await {
            Ok(arrivals) => Some(arrivals),
            Err(why) => {
                log::warn!("Bus arrivals for stop '{}' are unavailable: {}", bus_stop_code, why);
                None
            }
        }
    }

    /// Arrivals at the given stop with ETAs relative to now. The raw
    /// response is cached; ETAs are computed on every call.
    pub async fn try_arrivals(&self, bus_stop_code: &str) -> FetchResult<BusArrivals> {
        let bus_stop_code = bus_stop_code.trim();
        if bus_stop_code.is_empty() {
            return Err(FetchError::Other("bus stop code is blank".to_owned()));
        }
        let snapshot = self.cache.try_fetch(&self.request(bus_stop_code)).await?;
        Ok(to_bus_arrivals(&snapshot.payload, self.cache.clock().now()))
    }
}

/// Services are ordered by the number in their service number. Buses
/// without an arrival estimate are left out.
pub fn to_bus_arrivals(response: &BusArrivalResponse, now: DateTime<Utc>) -> BusArrivals {
    let mut services = response
        .services
        .iter()
        .map(|service| BusService {
            service_no: service.service_no.trim().to_owned(),
            operator: service.operator.trim().to_owned(),
            next: service
                .upcoming()
                .filter_map(|bus| upcoming_bus(bus, now))
                .collect(),
        })
        .collect::<Vec<_>>();
    services.sort_by_key(BusService::sort_key);

    BusArrivals {
        bus_stop_code: response.bus_stop_code.clone(),
        services,
    }
}

fn upcoming_bus(row: &NextBusRow, now: DateTime<Utc>) -> Option<UpcomingBus> {
    let estimated_arrival = row.estimated_arrival?;
    let position = match (row.latitude, row.longitude) {
        (Some(latitude), Some(longitude)) if latitude != 0.0 || longitude != 0.0 => {
            Some(Wgs84::new(latitude, longitude))
        }
        _ => None,
    };
    Some(UpcomingBus {
        estimated_arrival,
        eta: ArrivalEta::between(estimated_arrival, now),
        origin_code: non_blank(&row.origin_code),
        destination_code: non_blank(&row.destination_code),
        monitored: row.monitored == Some(1.0),
        load: BusLoad::from_code(&row.load),
        deck: DeckType::from_code(&row.deck),
        wheelchair_accessible: row.feature.trim() == "WAB",
        position,
    })
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}
