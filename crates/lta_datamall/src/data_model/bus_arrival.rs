use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use utility::serde::{date_time, lenient};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BusArrivalResponse {
    pub bus_stop_code: String,
    #[serde(default)]
    pub services: Vec<ServiceRow>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceRow {
    pub service_no: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub next_bus: Option<NextBusRow>,
    #[serde(default)]
    pub next_bus2: Option<NextBusRow>,
    #[serde(default)]
    pub next_bus3: Option<NextBusRow>,
}

impl ServiceRow {
    pub fn upcoming(&self) -> impl Iterator<Item = &NextBusRow> {
        [&self.next_bus, &self.next_bus2, &self.next_bus3]
            .into_iter()
            .flatten()
    }
}

/// An upcoming bus. Every field is an empty string when there is none.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NextBusRow {
    #[serde(default)]
    pub origin_code: String,

    #[serde(default)]
    pub destination_code: String,

    #[serde(default, deserialize_with = "date_time::deserialize_fixed_option")]
    pub estimated_arrival: Option<DateTime<FixedOffset>>,

    /// `1` if the estimate is based on the bus location.
    #[serde(default, deserialize_with = "lenient::deserialize_f64_option")]
    pub monitored: Option<f64>,

    #[serde(default, deserialize_with = "lenient::deserialize_f64_option")]
    pub latitude: Option<f64>,

    #[serde(default, deserialize_with = "lenient::deserialize_f64_option")]
    pub longitude: Option<f64>,

    /// `SEA`, `SDA` or `LSD`.
    #[serde(default)]
    pub load: String,

    /// `WAB` if wheelchair accessible.
    #[serde(default)]
    pub feature: String,

    /// `SD`, `DD` or `BD`.
    #[serde(default, rename = "Type")]
    pub deck: String,
}
