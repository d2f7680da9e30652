//! Conversion between WGS84 geographic coordinates and SVY21, the projected
//! coordinate system (EPSG:3414) used by Singapore's land authority.
//!
//! SVY21 is a transverse mercator projection in metres, so planar euclidean
//! distance between two projected points is meaningful. All distance math in
//! this workspace is done on projected points.

use std::{fmt, sync::OnceLock};

use proj4rs::{proj::Proj, transform::transform};
use thiserror::Error;

/// PROJ.4 definition of plain WGS84 longitude/latitude (EPSG:4326).
pub const WGS84_PROJ_STRING: &str = "+proj=longlat +ellps=WGS84 +no_defs";

/// PROJ.4 definition of SVY21 / Singapore TM (EPSG:3414).
pub const SVY21_PROJ_STRING: &str = "+proj=tmerc +lat_0=1.366666666666667 \
    +lon_0=103.8333333333333 +k=1 +x_0=28001.642 +y_0=38744.572 \
    +ellps=WGS84 +units=m +no_defs";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateConversionError {
    #[error("invalid projection definition: {0}")]
    Definition(String),
    #[error("could not project ({first}, {second}): {reason}")]
    Transform {
        first: f64,
        second: f64,
        reason: String,
    },
    #[error("coordinate batch length mismatch: {xs} x values, {ys} y values")]
    LengthMismatch { xs: usize, ys: usize },
}

/// Bidirectional WGS84 <-> SVY21 projection.
///
/// Input is not range checked. Whatever `proj4rs` rejects, and any
/// non-finite output, is reported as a [`CoordinateConversionError`];
/// everything else is passed through the projection math unchanged.
pub struct Svy21Projection {
    geographic: Proj,
    projected: Proj,
}

impl fmt::Debug for Svy21Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Svy21Projection")
            .field("projected", &SVY21_PROJ_STRING)
            .finish()
    }
}

static SHARED: OnceLock<Result<Svy21Projection, CoordinateConversionError>> = OnceLock::new();

impl Svy21Projection {
    pub fn new() -> Result<Self, CoordinateConversionError> {
        let geographic = Proj::from_proj_string(WGS84_PROJ_STRING)
            .map_err(|why| CoordinateConversionError::Definition(why.to_string()))?;
        let projected = Proj::from_proj_string(SVY21_PROJ_STRING)
            .map_err(|why| CoordinateConversionError::Definition(why.to_string()))?;
        Ok(Self {
            geographic,
            projected,
        })
    }

    /// Process wide instance, built on first use.
    pub fn shared() -> Result<&'static Self, CoordinateConversionError> {
        SHARED
            .get_or_init(Self::new)
            .as_ref()
            .map_err(|why| why.clone())
    }

    /// WGS84 degrees to SVY21 `(x, y)` metres, x being the easting.
    pub fn to_projected(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<(f64, f64), CoordinateConversionError> {
        let mut point = (longitude.to_radians(), latitude.to_radians(), 0.0);
        transform(&self.geographic, &self.projected, &mut point).map_err(|why| {
            CoordinateConversionError::Transform {
                first: latitude,
                second: longitude,
                reason: why.to_string(),
            }
        })?;
        finite(latitude, longitude, (point.0, point.1))
    }

    /// SVY21 `(x, y)` metres to WGS84 `(latitude, longitude)` degrees.
    pub fn to_geographic(
        &self,
        x: f64,
        y: f64,
    ) -> Result<(f64, f64), CoordinateConversionError> {
        let mut point = (x, y, 0.0);
        transform(&self.projected, &self.geographic, &mut point).map_err(|why| {
            CoordinateConversionError::Transform {
                first: x,
                second: y,
                reason: why.to_string(),
            }
        })?;
        finite(x, y, (point.1.to_degrees(), point.0.to_degrees()))
    }

    /// Vectorised [`Self::to_geographic`]. Returns `(latitudes, longitudes)`
    /// in input order. The first failing point fails the whole batch.
    pub fn to_geographic_batch(
        &self,
        xs: &[f64],
        ys: &[f64],
    ) -> Result<(Vec<f64>, Vec<f64>), CoordinateConversionError> {
        if xs.len() != ys.len() {
            return Err(CoordinateConversionError::LengthMismatch {
                xs: xs.len(),
                ys: ys.len(),
            });
        }
        let mut latitudes = Vec::with_capacity(xs.len());
        let mut longitudes = Vec::with_capacity(xs.len());
        for (x, y) in xs.iter().zip(ys) {
            let (latitude, longitude) = self.to_geographic(*x, *y)?;
            latitudes.push(latitude);
            longitudes.push(longitude);
        }
        Ok((latitudes, longitudes))
    }
}

fn finite(
    first: f64,
    second: f64,
    result: (f64, f64),
) -> Result<(f64, f64), CoordinateConversionError> {
    if result.0.is_finite() && result.1.is_finite() {
        Ok(result)
    } else {
        Err(CoordinateConversionError::Transform {
            first,
            second,
            reason: "projection produced a non-finite value".to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const EARTH_RADIUS_M: f64 = 6_371_000.0;

    /// Great circle distance, only used to measure round trip error.
    fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (lon2 - lon1).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }

    #[test]
    fn origin_maps_to_false_easting_and_northing() {
        let projection = Svy21Projection::new().unwrap();
        let (x, y) = projection
            .to_projected(1.366666666666667, 103.8333333333333)
            .unwrap();
        assert!((x - 28001.642).abs() < 0.01, "x = {x}");
        assert!((y - 38744.572).abs() < 0.01, "y = {y}");
    }

    #[rstest]
    #[case(1.3521, 103.8198)]
    #[case(1.2966, 103.7764)]
    #[case(1.4382, 103.7890)]
    #[case(1.3644, 103.9915)]
    #[case(1.2494, 103.8303)]
    #[case(1.1304753, 103.6020882)]
    #[case(1.492007, 104.145897)]
    fn round_trip_within_a_metre(#[case] latitude: f64, #[case] longitude: f64) {
        let projection = Svy21Projection::new().unwrap();
        let (x, y) = projection.to_projected(latitude, longitude).unwrap();
        let (back_lat, back_lon) = projection.to_geographic(x, y).unwrap();
        assert!(haversine_m(latitude, longitude, back_lat, back_lon) < 1.0);
    }

    #[test]
    fn projected_distance_matches_ground_distance() {
        let projection = Svy21Projection::new().unwrap();
        let (x1, y1) = projection.to_projected(1.3521, 103.8198).unwrap();
        let (x2, y2) = projection.to_projected(1.3621, 103.8298).unwrap();
        let planar = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
        let ground = haversine_m(1.3521, 103.8198, 1.3621, 103.8298);
        assert!((planar - ground).abs() / ground < 0.005);
    }

    #[test]
    fn batch_matches_scalar() {
        let projection = Svy21Projection::new().unwrap();
        let xs = [28001.642, 30000.0, 21500.25, 41000.0];
        let ys = [38744.572, 31000.0, 45210.75, 36000.0];
        let (lats, lons) = projection.to_geographic_batch(&xs, &ys).unwrap();
        for i in 0..xs.len() {
            let (lat, lon) = projection.to_geographic(xs[i], ys[i]).unwrap();
            assert_eq!(lats[i], lat);
            assert_eq!(lons[i], lon);
        }
    }

    #[test]
    fn batch_rejects_mismatched_lengths() {
        let projection = Svy21Projection::new().unwrap();
        assert_eq!(
            projection.to_geographic_batch(&[1.0, 2.0], &[1.0]),
            Err(CoordinateConversionError::LengthMismatch { xs: 2, ys: 1 })
        );
    }

    #[test]
    fn non_finite_input_is_an_error() {
        let projection = Svy21Projection::new().unwrap();
        assert!(projection.to_projected(f64::NAN, 103.8).is_err());
        assert!(projection.to_geographic(f64::INFINITY, 30000.0).is_err());
    }

    #[test]
    fn shared_instance_is_reused() {
        let first = Svy21Projection::shared().unwrap() as *const Svy21Projection;
        let second = Svy21Projection::shared().unwrap() as *const Svy21Projection;
        assert_eq!(first, second);
    }
}
