pub use crate::common::RouteResult;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{extract::FromRef, routing::on, Router};
use catalog::{CatalogSource, CsvCatalogSource, LocationCatalog, ProximityFilter};
use live_feed::{pool::WorkerPool, FeedSource, FetchError, HttpFeedSource};
use lta_datamall::{BusArrivalFeed, CarparkAvailabilityFeed};
use nearby::NearbyCarparks;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use utility::geo::CoordinateConversionError;

use crate::{
    common::{route_not_found, METHOD_FILTER_ALL},
    config::Config,
};

pub mod api;
pub mod common;
pub mod config;
pub mod hateoas;
pub mod middleware;

#[cfg(test)]
pub(crate) mod testing;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("could not set up the live feed client: {0}")]
    Fetch(#[from] FetchError),
    #[error("could not set up the SVY21 projection: {0}")]
    Projection(#[from] CoordinateConversionError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, FromRef)]
pub struct WebState {
    pub nearby: Arc<NearbyCarparks>,
    pub catalog: Arc<LocationCatalog>,
    pub availability: Arc<CarparkAvailabilityFeed>,
    pub bus_arrivals: Arc<BusArrivalFeed>,
    /// Pause between two events of a live stream.
    pub refresh_interval: Duration,
}

impl WebState {
    /// Reads the catalog from disk and live feeds from DataMall.
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        let pool = WorkerPool::new(config.feed_pool_size);
        let feed_source = HttpFeedSource::new(config.http_timeout, pool)?;
        let catalog_source = CsvCatalogSource::new(&config.catalog_path);
        Self::with_sources(config, Arc::new(catalog_source), Arc::new(feed_source))
    }

    pub fn with_sources(
        config: &Config,
        catalog_source: Arc<dyn CatalogSource>,
        feed_source: Arc<dyn FeedSource>,
    ) -> Result<Self, StartupError> {
        let catalog = Arc::new(LocationCatalog::new(catalog_source));
        let filter = ProximityFilter::new(catalog.clone())?;
        let availability = Arc::new(CarparkAvailabilityFeed::new(
            config.credentials.clone(),
            feed_source.clone(),
            config.carpark_window,
        ));
        let bus_arrivals = Arc::new(BusArrivalFeed::new(
            config.credentials.clone(),
            feed_source,
            config.bus_arrival_window,
        ));

        Ok(Self {
            nearby: Arc::new(NearbyCarparks::new(filter, availability.clone())),
            catalog,
            availability,
            bus_arrivals,
            refresh_interval: config.refresh_interval,
        })
    }
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .nest_service("/api", api::routes(state))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO)),
        )
}

/// Serves until `shutdown` is cancelled.
pub async fn start_web_server(
    state: WebState,
    bind_address: SocketAddr,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_address).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
