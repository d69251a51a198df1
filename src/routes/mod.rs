//! Router assembly: generated collection routes, discovery routes and common routes.

mod common;
mod entity;

pub use common::common_routes;
pub use entity::{describe_routes, entity_routes, RouteSpec};

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::{Bytes, HttpBody},
    http::{header::CONTENT_TYPE, Response, StatusCode},
    middleware::map_response,
    response::IntoResponse,
    BoxError, Router,
};
use tower_http::limit::RequestBodyLimitLayer;

/// Full application router with request bodies capped at `body_limit` bytes.
pub fn app(state: AppState, body_limit: usize) -> Router {
    entity_routes(state.clone())
        .merge(common_routes(state))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(map_response(error_envelope))
}

/// The body-limit layer answers an over-limit `Content-Length` itself, in plain text.
async fn error_envelope<B>(res: Response<B>) -> axum::response::Response
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let is_json = res
        .headers()
        .get(CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));
    if res.status() == StatusCode::PAYLOAD_TOO_LARGE && !is_json {
        return AppError::PayloadTooLarge("request body exceeds the configured limit".into()).into_response();
    }
    res.into_response()
}
