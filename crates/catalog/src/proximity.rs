use std::sync::Arc;

use itertools::Itertools;
use model::{
    carpark::{CatalogEntity, ProximityResult},
    geo::{Svy21, Wgs84},
};
use thiserror::Error;
use utility::geo::{CoordinateConversionError, Svy21Projection};

use crate::{cache::LocationCatalog, CatalogError};

#[derive(Debug, Clone, Error)]
pub enum ProximityError {
    #[error("carpark catalog is unavailable: {0}")]
    CatalogUnavailable(#[from] CatalogError),
    #[error(transparent)]
    CoordinateConversion(#[from] CoordinateConversionError),
}

/// Radius search over the carpark catalog.
///
/// Distances are planar, measured in SVY21 metres.
#[derive(Clone)]
pub struct ProximityFilter {
    catalog: Arc<LocationCatalog>,
    projection: &'static Svy21Projection,
}

impl ProximityFilter {
    pub fn new(catalog: Arc<LocationCatalog>) -> Result<Self, CoordinateConversionError> {
        Ok(Self {
            catalog,
            projection: Svy21Projection::shared()?,
        })
    }

    pub fn catalog(&self) -> &Arc<LocationCatalog> {
        &self.catalog
    }

    /// Like [`Self::try_find_nearby`], but every failure is logged and
    /// reported as no results.
    pub fn find_nearby(&self, latitude: f64, longitude: f64, radius_m: f64) -> Vec<ProximityResult> {
        match self.try_find_nearby(latitude, longitude, radius_m) {
            Ok(results) => results,
            Err(why) => {
                log::warn!(
                    "Nearby search around ({}, {}) failed: {}",
                    latitude,
                    longitude,
                    why
                );
                vec![]
            }
        }
    }

    /// Carparks within `radius_m` metres of the given point, nearest first.
    /// Carparks at equal distance keep their catalog order. A negative or NaN
    /// radius matches nothing.
    pub fn try_find_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: f64,
    ) -> Result<Vec<ProximityResult>, ProximityError> {
        if radius_m.is_nan() || radius_m < 0.0 {
            return Ok(vec![]);
        }
        let center = Wgs84::new(latitude, longitude).to_svy21(self.projection)?;
        let entities = self.catalog.try_get()?;

        let matches = entities
            .iter()
            .map(|entity| (entity.position.distance_to(&center), entity))
            .filter(|(distance, _)| *distance <= radius_m)
            .sorted_by(|a, b| a.0.total_cmp(&b.0))
            .collect::<Vec<(f64, &CatalogEntity)>>();

        let points = matches
            .iter()
            .map(|(_, entity)| entity.position)
            .collect::<Vec<Svy21>>();
        let positions = Svy21::to_wgs84_batch(&points, self.projection)?;

        Ok(matches
            .into_iter()
            .zip(positions)
            .map(|((distance_m, entity), position)| ProximityResult {
                id: entity.id.clone(),
                position,
                address: entity.address.clone(),
                distance_m,
            })
            .collect())
    }
}
