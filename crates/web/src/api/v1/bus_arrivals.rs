use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, State},
    http::Method,
    routing::{get, on},
    Extension, Router,
};
use model::bus_arrival::BusArrivals;

use crate::{
    common::{route_not_found, schema, HateoasResult, RouteErrorResponse, METHOD_FILTER_ALL},
    hateoas,
    middleware::base_url::BaseUrl,
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/bus-arrivals{}", format_args!($($arg)*))
    };
}

/// Singapore bus stop codes are five digits, `01012` to `99189`.
const BUS_STOP_CODE_LEN: usize = 5;

fn is_bus_stop_code(code: &str) -> bool {
    code.len() == BUS_STOP_CODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema::<BusArrivals>))
        .route("/:code", get(bus_arrivals))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn bus_arrivals(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { bus_arrivals, .. }): State<WebState>,
    Path(code): Path<String>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<BusArrivals> {
    let code = code.trim();
    if !is_bus_stop_code(code) {
        return Err(RouteErrorResponse::bad_request("Bus stop codes are five digits.")
            .with_method(&Method::GET)
            .with_uri(original_uri.path()));
    }

    let arrivals = bus_arrivals.try_arrivals(code).await.map_err(|why| {
        RouteErrorResponse::from(why)
            .with_method(&Method::GET)
            .with_uri(original_uri.path())
    })?;

    Ok(hateoas::Response::builder(arrivals, base_url)
        .link("self", resource!("/{}", code))
        .link("schema", resource!("/schema"))
        .build()
        .json())
}
