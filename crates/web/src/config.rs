use std::{env, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use lta_datamall::LtaCredentials;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("LTA_API_KEY is not set")]
    MissingApiKey,
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Server settings, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: LtaCredentials,
    /// `CARPARK_CSV`
    pub catalog_path: PathBuf,
    /// `BIND_ADDRESS`
    pub bind_address: SocketAddr,
    /// `HTTP_TIMEOUT_SECS`
    pub http_timeout: Duration,
    /// `FEED_POOL_SIZE`, the number of DataMall requests in flight at once.
    pub feed_pool_size: usize,
    /// `CARPARK_WINDOW_SECS`
    pub carpark_window: Duration,
    /// `BUS_ARRIVAL_WINDOW_SECS`
    pub bus_arrival_window: Duration,
    /// `REFRESH_INTERVAL_SECS`, for the availability collector and live streams.
    pub refresh_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = lookup("LTA_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .map(|key| LtaCredentials::new(key.trim()))
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            credentials,
            catalog_path: lookup("CARPARK_CSV")
                .unwrap_or_else(|| "resources/data/HDBCarparkInformation.csv".to_owned())
                .into(),
            bind_address: parse(&lookup, "BIND_ADDRESS", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            http_timeout: seconds(&lookup, "HTTP_TIMEOUT_SECS", 10)?,
            feed_pool_size: positive(&lookup, "FEED_POOL_SIZE", 5)?,
            carpark_window: seconds(&lookup, "CARPARK_WINDOW_SECS", 120)?,
            bus_arrival_window: seconds(&lookup, "BUS_ARRIVAL_WINDOW_SECS", 60)?,
            refresh_interval: seconds(&lookup, "REFRESH_INTERVAL_SECS", 120)?,
        })
    }
}

fn parse<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn positive<F>(lookup: &F, name: &'static str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse(lookup, name, default)? {
        0 => Err(ConfigError::Invalid {
            name,
            value: "0".to_owned(),
        }),
        value => Ok(value),
    }
}

fn seconds<F>(lookup: &F, name: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    positive(lookup, name, default as usize).map(|secs| Duration::from_secs(secs as u64))
}
