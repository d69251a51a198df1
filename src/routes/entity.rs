//! Collection routes built from the schema registry.
//! Each collection gets explicit paths under the prefix; the schema rides along as an `Extension`
//! so the generic handlers know which collection they serve.

use crate::handlers::entity::{create, delete as delete_handler, list, read, read_path, replace};
use crate::handlers::{openapi_json, route_index};
use crate::registry::Schema;
use crate::state::AppState;
use axum::{routing::get, Extension, Router};
use std::sync::Arc;

/// One generated route, as listed by the route index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub method: &'static str,
    pub path: String,
}

/// Routes generated for `schema` under `prefix`, in registration order.
pub fn describe_routes(schema: &Schema, prefix: &str) -> Vec<RouteSpec> {
    let base = format!("{}{}", prefix, schema.collection_name());
    let route = |method, path: String| RouteSpec { method, path };
    vec![
        route("GET", base.clone()),
        route("GET", format!("{}/", base)),
        route("POST", base.clone()),
        route("POST", format!("{}/", base)),
        route("GET", format!("{}/:id", base)),
        route("PUT", format!("{}/:id", base)),
        route("DELETE", format!("{}/:id", base)),
        route("GET", format!("{}/:id/*path", base)),
    ]
}

pub fn entity_routes(state: AppState) -> Router {
    let mut router = Router::new()
        .route(&format!("{}openapi.json", state.prefix), get(openapi_json))
        .route(&format!("{}routes", state.prefix), get(route_index));

    for schema in state.registry.all_schemas() {
        let base = format!("{}{}", state.prefix, schema.collection_name());
        let ext = Extension(Arc::clone(schema));
        router = router
            .route(&base, get(list).post(create).layer(ext.clone()))
            .route(&format!("{}/", base), get(list).post(create).layer(ext.clone()))
            .route(
                &format!("{}/:id", base),
                get(read).put(replace).delete(delete_handler).layer(ext.clone()),
            )
            .route(&format!("{}/:id/*path", base), get(read_path).layer(ext));
        tracing::debug!(collection = %schema.collection_name(), base = %base, "mounted collection routes");
    }
    router.with_state(state)
}
