use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{geo::Wgs84, ExampleData};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusArrivals {
    pub bus_stop_code: String,
    pub services: Vec<BusService>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusService {
    pub service_no: String,
    pub operator: String,
    /// Up to three upcoming buses, soonest first.
    pub next: Vec<UpcomingBus>,
}

impl BusService {
    /// Services are listed by the first number in their service number, so
    /// `"CT8"` sorts as 8 and `"21A"` as 21. Services without a number go last.
    pub fn sort_key(&self) -> u64 {
        let digits = self
            .service_no
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>();
        digits.parse().unwrap_or(u64::MAX)
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingBus {
    pub estimated_arrival: DateTime<FixedOffset>,
    pub eta: ArrivalEta,
    pub origin_code: Option<String>,
    pub destination_code: Option<String>,
    /// Whether the estimate comes from live vehicle tracking.
    pub monitored: bool,
    pub load: BusLoad,
    pub deck: DeckType,
    pub wheelchair_accessible: bool,
    pub position: Option<Wgs84>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum BusLoad {
    SeatsAvailable,
    StandingAvailable,
    LimitedStanding,
    Unknown,
}

impl BusLoad {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "SEA" => Self::SeatsAvailable,
            "SDA" => Self::StandingAvailable,
            "LSD" => Self::LimitedStanding,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum DeckType {
    Single,
    Double,
    Bendy,
    Unknown,
}

impl DeckType {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "SD" => Self::Single,
            "DD" => Self::Double,
            "BD" => Self::Bendy,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", tag = "status", content = "minutes")]
pub enum ArrivalEta {
    Departed,
    Arriving,
    Minutes(i64),
}

impl ArrivalEta {
    pub fn between(estimated_arrival: DateTime<FixedOffset>, now: DateTime<Utc>) -> Self {
        let seconds = (estimated_arrival.with_timezone(&Utc) - now).num_seconds();
        if seconds < 0 {
            Self::Departed
        } else if seconds < 60 {
            Self::Arriving
        } else {
            Self::Minutes(seconds / 60)
        }
    }
}

impl fmt::Display for ArrivalEta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Departed => write!(f, "Departed"),
            Self::Arriving => write!(f, "Arriving"),
            Self::Minutes(minutes) => write!(f, "{} min", minutes),
        }
    }
}

impl ExampleData for BusArrivals {
    fn example_data() -> Self {
        let estimated_arrival = DateTime::parse_from_rfc3339("2024-08-14T16:41:48+08:00")
            .unwrap_or_else(|_| Utc::now().fixed_offset());
        Self {
            bus_stop_code: "83139".to_owned(),
            services: vec![BusService {
                service_no: "15".to_owned(),
                operator: "GAS".to_owned(),
                next: vec![UpcomingBus {
                    estimated_arrival,
                    eta: ArrivalEta::Minutes(4),
                    origin_code: Some("77009".to_owned()),
                    destination_code: Some("77009".to_owned()),
                    monitored: true,
                    load: BusLoad::SeatsAvailable,
                    deck: DeckType::Single,
                    wheelchair_accessible: true,
                    position: Some(Wgs84::new(1.316748, 103.9)),
                }],
            }],
        }
    }
}
