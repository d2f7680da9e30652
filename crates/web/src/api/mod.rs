use axum::{
    extract::State,
    routing::{get, on},
    Json, Router,
};
use serde::Serialize;

pub mod v1;

use crate::{
    common::{route_not_found, METHOD_FILTER_ALL},
    WebState,
};

/// Prefixes a path with `/api`.
macro_rules! resource {
    ($($arg:tt)*) => {
        format!("/api{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub fn routes(state: WebState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .with_state(state.clone())
        .nest_service("/v1", v1::routes(state))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Ping {
    status: &'static str,
    version: &'static str,
    /// Whether the carpark catalog is in memory. It loads on first use.
    catalog_loaded: bool,
}

async fn ping(State(WebState { catalog, .. }): State<WebState>) -> Json<Ping> {
    Json(Ping {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        catalog_loaded: catalog.is_loaded(),
    })
}
