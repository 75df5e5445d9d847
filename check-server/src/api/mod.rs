//! HTTP API assembly
//!
//! `build_router` wires the route modules; `build_app` adds the middleware
//! stack (CORS, tracing, request ids, timeout) and binds the state.

pub mod health;
pub mod orders;

use std::time::Duration;

use axum::Router;
use http::{HeaderName, HeaderValue, Request};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, Copy, Default)]
struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

pub fn build_router() -> Router<ServerState> {
    Router::new().merge(orders::router()).merge(health::router())
}

/// The full application: routes, middleware, state
pub fn build_app(state: &ServerState) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    build_router()
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            request_id_header,
            UuidRequestId::default(),
        ))
        .layer(TimeoutLayer::new(Duration::from_millis(
            state.config.request_timeout_ms,
        )))
        .with_state(state.clone())
}
