use std::{borrow::Cow, fmt};

use indexmap::IndexMap;
use schemars::{
    gen::SchemaGenerator,
    schema::{InstanceType, Schema, SchemaObject},
    JsonSchema,
};
use serde::{Deserialize, Serialize};
use utility::id::EntityId;

use crate::{
    geo::{Svy21, Wgs84},
    ExampleData,
};

/// A carpark from the static reference dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntity {
    pub id: EntityId,
    pub position: Svy21,
    pub address: String,
}

/// A catalog entity within the query radius, back-projected for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProximityResult {
    pub id: EntityId,
    pub position: Wgs84,
    pub address: String,
    pub distance_m: f64,
}

/// Kind of parking lot reported by the availability feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LotType {
    Car,
    HeavyVehicle,
    MotorcycleWithSidecar,
    Motorcycle,
    Other(String),
}

impl LotType {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "C" => Self::Car,
            "H" => Self::HeavyVehicle,
            "S" => Self::MotorcycleWithSidecar,
            "Y" => Self::Motorcycle,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Car => "C",
            Self::HeavyVehicle => "H",
            Self::MotorcycleWithSidecar => "S",
            Self::Motorcycle => "Y",
            Self::Other(code) => code,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Car => "Cars",
            Self::HeavyVehicle => "Heavy vehicles",
            Self::MotorcycleWithSidecar => "Motorcycles with side car",
            Self::Motorcycle => "Motorcycles",
            Self::Other(code) if code.is_empty() => "Unknown",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for LotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl Serialize for LotType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for LotType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(|code| LotType::from_code(&code))
    }
}

impl JsonSchema for LotType {
    fn schema_name() -> String {
        "LotType".to_owned()
    }

    fn schema_id() -> Cow<'static, str> {
        Cow::Borrowed(concat!(module_path!(), "::LotType"))
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        SchemaObject {
            instance_type: Some(InstanceType::String.into()),
            format: Some("lot-type-code".to_owned()),
            ..Default::default()
        }
        .into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum AvailabilityLevel {
    /// More than 20 lots free.
    Plenty,
    /// Between 1 and 20 lots free.
    Limited,
    Full,
}

impl AvailabilityLevel {
    pub fn from_lots(lots_available: u32) -> Self {
        match lots_available {
            0 => Self::Full,
            1..=20 => Self::Limited,
            _ => Self::Plenty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LotAvailability {
    pub lot_type: LotType,
    pub lots_available: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LotStatus {
    pub lots_available: u32,
    pub level: AvailabilityLevel,
}

impl From<&LotAvailability> for LotStatus {
    fn from(value: &LotAvailability) -> Self {
        Self {
            lots_available: value.lots_available,
            level: AvailabilityLevel::from_lots(value.lots_available),
        }
    }
}

/// Live lots of one carpark, in feed order.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarparkLots {
    pub development: Option<String>,
    pub area: Option<String>,
    pub agency: Option<String>,
    pub lots: Vec<LotAvailability>,
}

/// Parsed availability feed, keyed by normalised carpark number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CarparkAvailability {
    pub carparks: IndexMap<EntityId, CarparkLots>,
}

impl CarparkAvailability {
    pub fn get(&self, id: &EntityId) -> Option<&CarparkLots> {
        self.carparks.get(id)
    }

    pub fn len(&self) -> usize {
        self.carparks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carparks.is_empty()
    }
}

/// A nearby carpark joined with its live availability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedRecord {
    pub id: EntityId,
    pub marker_label: String,
    pub position: Wgs84,
    pub address: String,
    pub distance_m: f64,
    pub distance_label: String,
    /// Empty when the feed had nothing for this carpark.
    pub live_status: IndexMap<LotType, LotStatus>,
}

impl AggregatedRecord {
    pub fn has_live_status(&self) -> bool {
        !self.live_status.is_empty()
    }
}

impl ExampleData for AggregatedRecord {
    fn example_data() -> Self {
        let mut live_status = IndexMap::new();
        live_status.insert(
            LotType::Car,
            LotStatus {
                lots_available: 143,
                level: AvailabilityLevel::Plenty,
            },
        );
        live_status.insert(
            LotType::Motorcycle,
            LotStatus {
                lots_available: 4,
                level: AvailabilityLevel::Limited,
            },
        );
        Self {
            id: EntityId::new("BM29"),
            marker_label: marker_label(0),
            position: Wgs84::new(1.3521, 103.8198),
            address: "BLK 249 BISHAN STREET 22".to_owned(),
            distance_m: 212.4,
            distance_label: format_distance(212.4),
            live_status,
        }
    }
}

/// `"85m"` below 100 metres, `"0.21km"` from there on.
pub fn format_distance(distance_m: f64) -> String {
    if distance_m < 100.0 {
        format!("{:.0}m", distance_m)
    } else {
        format!("{:.2}km", distance_m / 1000.0)
    }
}

/// Map marker label for the n-th result: `A` to `E`, then `6`, `7`, ...
pub fn marker_label(index: usize) -> String {
    const LABELS: [&str; 5] = ["A", "B", "C", "D", "E"];
    LABELS
        .get(index)
        .map(|label| (*label).to_owned())
        .unwrap_or_else(|| (index + 1).to_string())
}
