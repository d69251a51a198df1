//! Discovery handlers: OpenAPI document and route index.

use crate::openapi;
use crate::response::success_one_ok;
use crate::routes::describe_routes;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use std::collections::BTreeMap;

pub async fn openapi_json(State(state): State<AppState>) -> impl IntoResponse {
    Json(openapi::document(&state.registry, &state.prefix))
}

/// `{"data": {"<collection>": {"<METHOD>": ["<path>", ...]}}}`
pub async fn route_index(State(state): State<AppState>) -> impl IntoResponse {
    let mut index: BTreeMap<String, BTreeMap<&'static str, Vec<String>>> = BTreeMap::new();
    for schema in state.registry.all_schemas() {
        let by_method = index.entry(schema.collection_name().to_string()).or_default();
        for route in describe_routes(schema, &state.prefix) {
            by_method.entry(route.method).or_default().push(route.path);
        }
    }
    success_one_ok(index)
}
