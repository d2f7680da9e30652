//! Response bodies of the DataMall endpoints, as sent.

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

pub mod bus_arrival;
pub mod carpark_availability;

/// OData envelope used by the paged DataMall endpoints.
///
/// Rows are read one at a time; a row that does not parse is logged and
/// left out instead of failing the whole page.
#[derive(Debug, Clone)]
pub struct Response<T> {
    pub value: Vec<T>,
    /// Rows in the page before malformed ones were dropped.
    pub received: usize,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    value: Vec<Value>,
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Response<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let envelope = Envelope::deserialize(deserializer)?;
        let received = envelope.value.len();
        let value = envelope
            .value
            .into_iter()
            .enumerate()
            .filter_map(|(index, row)| match serde_json::from_value(row) {
                Ok(row) => Some(row),
                Err(why) => {
                    log::warn!("Skipping malformed row {}: {}", index, why);
                    None
                }
            })
            .collect();
        Ok(Self { value, received })
    }
}
