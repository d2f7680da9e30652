use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::{OriginalUri, Query, State},
    http::{Method, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, on, post},
    Extension, Router,
};
use axum_extra::TypedHeader;
use futures::{future, Stream, StreamExt};
use model::nearby::{NearbyQuery, NearbyResponse, DEFAULT_RADIUS_M, DEFAULT_RESULT_LIMIT};
use nearby::Dispatcher;
use serde::Deserialize;
use tokio::time::{self, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;

use crate::{
    common::{route_not_found, schema, HateoasResult, RouteErrorResponse, RouteResult, METHOD_FILTER_ALL},
    hateoas,
    middleware::base_url::BaseUrl,
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/carparks{}", format_args!($($arg)*))
    };
}

/// Searches wider than this are refused.
const MAX_RADIUS_M: f64 = 5000.0;

/// Queries of one live stream allowed in flight at once.
const LIVE_QUERIES_IN_FLIGHT: usize = 2;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/nearby", get(nearby))
        .route("/nearby/live", get(nearby_live))
        .route("/nearby/schema", get(schema::<NearbyResponse>))
        .route("/catalog/invalidate", post(invalidate_catalog))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NearbyParams {
    latitude: f64,
    longitude: f64,
    radius: Option<f64>,
    limit: Option<usize>,
}

impl NearbyParams {
    fn query(&self) -> Result<NearbyQuery, RouteErrorResponse> {
        let radius_m = self.radius.unwrap_or(DEFAULT_RADIUS_M);
        if !(0.0..=MAX_RADIUS_M).contains(&radius_m) {
            return Err(RouteErrorResponse::bad_request(format!(
                "The radius must be between 0 and {} metres.",
                MAX_RADIUS_M
            )));
        }
        Ok(NearbyQuery::new(self.latitude, self.longitude)
            .with_radius(radius_m)
            .with_limit(Some(self.limit.unwrap_or(DEFAULT_RESULT_LIMIT))))
    }
}

fn query_string(query: &NearbyQuery) -> String {
    let mut query_string = format!(
        "?latitude={}&longitude={}&radius={}",
        query.latitude, query.longitude, query.radius_m
    );
    if let Some(limit) = query.limit {
        query_string.push_str(&format!("&limit={}", limit));
    }
    query_string
}

async fn nearby(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { nearby, .. }): State<WebState>,
    Query(params): Query<NearbyParams>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<NearbyResponse> {
    let query = params
        .query()
        .map_err(|why| why.with_method(&Method::GET).with_uri(original_uri.path()))?;
    let response = nearby.query(query).await;
    let query_string = query_string(&query);

    Ok(hateoas::Response::builder(response, base_url)
        .link("self", resource!("/nearby{}", query_string))
        .link("live", resource!("/nearby/live{}", query_string))
        .link("schema", resource!("/nearby/schema"))
        .build()
        .json())
}

/// Runs `query` once per `refresh_interval`, starting immediately.
///
/// A query still running when the next tick fires does not hold it back.
/// Both run, and the dispatcher drops the older one's result, so a slow
/// refresh is never shown after a newer one.
fn nearby_responses(
    dispatcher: Arc<Dispatcher>,
    query: NearbyQuery,
    refresh_interval: Duration,
) -> impl Stream<Item = NearbyResponse> {
    let mut ticks = time::interval(refresh_interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    IntervalStream::new(ticks)
        .map(move |_| {
            let dispatcher = dispatcher.clone();
            async move { dispatcher.dispatch(query).await }
        })
        .buffer_unordered(LIVE_QUERIES_IN_FLIGHT)
        .filter_map(future::ready)
}

/// Streams the nearby query every refresh interval.
async fn nearby_live(
    OriginalUri(original_uri): OriginalUri,
    user_agent: Option<TypedHeader<headers::UserAgent>>,
    State(WebState {
        nearby,
        refresh_interval,
        ..
    }): State<WebState>,
    Query(params): Query<NearbyParams>,
) -> RouteResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let query = params
        .query()
        .map_err(|why| why.with_method(&Method::GET).with_uri(original_uri.path()))?;
    log::info!(
        "`{}` subscribed to carparks around ({}, {})",
        user_agent
            .as_ref()
            .map(|TypedHeader(user_agent)| user_agent.as_str())
            .unwrap_or("unknown client"),
        query.latitude,
        query.longitude
    );

    let dispatcher = Arc::new(Dispatcher::new(nearby));
    let stream = nearby_responses(dispatcher, query, refresh_interval).filter_map(|response| {
        future::ready(match Event::default().event("nearby").json_data(&response) {
            Ok(event) => Some(Ok(event)),
            Err(why) => {
                log::error!("Could not encode nearby event: {}", why);
                None
            }
        })
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn invalidate_catalog(State(WebState { catalog, .. }): State<WebState>) -> StatusCode {
    catalog.invalidate();
    StatusCode::NO_CONTENT
}
