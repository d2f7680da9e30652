pub mod bus_arrivals;
pub mod carparks;
pub mod client;
pub mod collector;
pub mod data_model;

pub use bus_arrivals::BusArrivalFeed;
pub use carparks::CarparkAvailabilityFeed;
pub use client::LtaCredentials;
pub use collector::AvailabilityCollector;

/// Live lot counts of carparks managed by HDB, LTA and URA, 500 rows per page.
pub const CARPARK_AVAILABILITY_URL: &str =
    "https://datamall2.mytransport.sg/ltaodataservice/CarParkAvailabilityv2";

/// Arrival estimates for the next three buses of every service at a stop.
pub const BUS_ARRIVAL_URL: &str = "https://datamall2.mytransport.sg/ltaodataservice/v3/BusArrival";
