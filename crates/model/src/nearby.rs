use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{carpark::AggregatedRecord, ExampleData};

pub const DEFAULT_RADIUS_M: f64 = 500.0;
pub const DEFAULT_RESULT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
    pub limit: Option<usize>,
}

impl NearbyQuery {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius_m: DEFAULT_RADIUS_M,
            limit: Some(DEFAULT_RESULT_LIMIT),
        }
    }

    pub fn with_radius(mut self, radius_m: f64) -> Self {
        self.radius_m = radius_m;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// Outcome of a nearby query. Every variant is a benign, self-correcting
/// state the rendering layer shows in place of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum NearbyStatus {
    Available,
    /// Nearby carparks were found but the live feed could not be fetched;
    /// records carry no live status.
    LiveDataUnavailable,
    NoResults,
    CatalogUnavailable,
    LocationUnresolvable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NearbyResponse {
    pub query: NearbyQuery,
    pub status: NearbyStatus,
    pub records: Vec<AggregatedRecord>,
}

impl NearbyResponse {
    pub fn empty(query: NearbyQuery, status: NearbyStatus) -> Self {
        Self {
            query,
            status,
            records: vec![],
        }
    }
}

impl ExampleData for NearbyResponse {
    fn example_data() -> Self {
        Self {
            query: NearbyQuery::new(1.3521, 103.8198),
            status: NearbyStatus::Available,
            records: vec![AggregatedRecord::example_data()],
        }
    }
}
