use serde::Deserialize;

/// One row of `HDBCarparkInformation.csv`.
///
/// The file carries more columns (car park type, parking system, free
/// parking, ...); only the ones needed for locating a carpark are read.
#[derive(Debug, Clone, Deserialize)]
pub struct CarparkRow {
    #[serde(rename = "car_park_no")]
    pub id: String,

    pub address: String,

    /// SVY21 easting in metres.
    #[serde(rename = "x_coord")]
    pub x: f64,

    /// SVY21 northing in metres.
    #[serde(rename = "y_coord")]
    pub y: f64,
}
