use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::geo::{CoordinateConversionError, Svy21Projection};

/// Geographic WGS84 position in degrees.
///
/// Has no distance function; degrees are not uniform in
/// length, project to [`Svy21`] first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Wgs84 {
    pub latitude: f64,
    pub longitude: f64,
}

/// Projected SVY21 position in metres (`x` easting, `y` northing).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Svy21 {
    pub x: f64,
    pub y: f64,
}

impl Wgs84 {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn to_svy21(
        &self,
        projection: &Svy21Projection,
    ) -> Result<Svy21, CoordinateConversionError> {
        let (x, y) = projection.to_projected(self.latitude, self.longitude)?;
        Ok(Svy21 { x, y })
    }
}

impl Svy21 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_wgs84(
        &self,
        projection: &Svy21Projection,
    ) -> Result<Wgs84, CoordinateConversionError> {
        let (latitude, longitude) = projection.to_geographic(self.x, self.y)?;
        Ok(Wgs84 {
            latitude,
            longitude,
        })
    }

    /// Planar euclidean distance in metres.
    pub fn distance_to(&self, other: &Svy21) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Back-projects many points at once, preserving order.
    pub fn to_wgs84_batch(
        points: &[Svy21],
        projection: &Svy21Projection,
    ) -> Result<Vec<Wgs84>, CoordinateConversionError> {
        let (xs, ys): (Vec<f64>, Vec<f64>) = points.iter().map(|p| (p.x, p.y)).unzip();
        let (latitudes, longitudes) = projection.to_geographic_batch(&xs, &ys)?;
        Ok(latitudes
            .into_iter()
            .zip(longitudes)
            .map(|(latitude, longitude)| Wgs84::new(latitude, longitude))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean_in_metres() {
        let a = Svy21::new(30_000.0, 30_000.0);
        let b = Svy21::new(30_300.0, 30_400.0);
        assert_eq!(a.distance_to(&b), 500.0);
        assert_eq!(b.distance_to(&a), 500.0);
    }

    #[test]
    fn batch_back_projection_keeps_order() {
        let projection = Svy21Projection::new().unwrap();
        let points = [Svy21::new(28001.642, 38744.572), Svy21::new(35_000.0, 32_000.0)];
        let geographic = Svy21::to_wgs84_batch(&points, &projection).unwrap();
        assert_eq!(geographic.len(), 2);
        assert_eq!(geographic[1], points[1].to_wgs84(&projection).unwrap());
        assert!((geographic[0].latitude - 1.366666666666667).abs() < 1e-6);
    }
}
