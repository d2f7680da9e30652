use serde::Deserialize;
use utility::serde::lenient;

/// One lot type of one carpark.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CarparkAvailabilityRow {
    #[serde(rename = "CarParkID")]
    pub carpark_id: String,

    #[serde(default)]
    pub area: String,

    #[serde(default)]
    pub development: String,

    /// `"<latitude> <longitude>"`.
    #[serde(default)]
    pub location: String,

    /// `HDB`, `LTA` or `URA`.
    #[serde(default)]
    pub agency: String,

    #[serde(default = "default_lot_type")]
    pub lot_type: String,

    #[serde(default, deserialize_with = "lenient::deserialize_u32")]
    pub available_lots: u32,
}

fn default_lot_type() -> String {
    "C".to_owned()
}
