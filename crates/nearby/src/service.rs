use std::sync::Arc;

use catalog::{ProximityError, ProximityFilter};
use lta_datamall::CarparkAvailabilityFeed;
use model::nearby::{NearbyQuery, NearbyResponse, NearbyStatus};

use crate::aggregate::aggregate;

/// Answers "which carparks are near here, and how full are they".
#[derive(Clone)]
pub struct NearbyCarparks {
    filter: ProximityFilter,
    availability: Arc<CarparkAvailabilityFeed>,
}

impl NearbyCarparks {
    pub fn new(filter: ProximityFilter, availability: Arc<CarparkAvailabilityFeed>) -> Self {
        Self {
            filter,
            availability,
        }
    }

    pub fn filter(&self) -> &ProximityFilter {
        &self.filter
    }

    /// The radius search runs on the blocking pool while the live feed is
    /// fetched. Failures never escape; they are reported in the status.
    pub async fn query(&self, query: NearbyQuery) -> NearbyResponse {
        let filter = self.filter.clone();
        let search = tokio::task::spawn_blocking(move || {
            filter.try_find_nearby(query.latitude, query.longitude, query.radius_m)
        });
        let (search, availability) = tokio::join!(search, self.availability.availability());

        let results = match search {
            Ok(Ok(results)) => results,
            Ok(Err(ProximityError::CatalogUnavailable(why))) => {
                log::error!("Carpark catalog is unavailable: {}", why);
                return NearbyResponse::empty(query, NearbyStatus::CatalogUnavailable);
            }
            Ok(Err(ProximityError::CoordinateConversion(why))) => {
                log::warn!(
                    "Cannot resolve ({}, {}): {}",
                    query.latitude,
                    query.longitude,
                    why
                );
                return NearbyResponse::empty(query, NearbyStatus::LocationUnresolvable);
            }
            Err(why) => {
                log::error!("Nearby search did not complete: {}", why);
                return NearbyResponse::empty(query, NearbyStatus::CatalogUnavailable);
            }
        };

        if results.is_empty() {
            return NearbyResponse::empty(query, NearbyStatus::NoResults);
        }

        let status = match availability {
            Some(_) => NearbyStatus::Available,
            None => NearbyStatus::LiveDataUnavailable,
        };
        NearbyResponse {
            query,
            status,
            records: aggregate(&results, availability.as_ref(), query.limit),
        }
    }
}
