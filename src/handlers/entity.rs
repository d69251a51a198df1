//! Generic collection handlers: list, create, read, path walk, replace, delete.
//!
//! Every handler receives the target schema through an `Extension` attached per collection route,
//! so one set of handlers serves every registered schema.

use crate::error::AppError;
use crate::extractors::JsonBody;
use crate::registry::Schema;
use crate::response::{success_many, success_one, success_one_ok};
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use std::collections::HashMap;
use std::sync::Arc;

fn parse_id(schema: &Schema, raw: &str) -> Result<u64, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("{}/{}", schema.collection_name(), raw)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(schema): Extension<Arc<Schema>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let query = state.compiler.compile(&params, &schema)?;
    let result = CrudService::list(state.store.as_ref(), &schema, &query).await?;
    Ok(success_many(result.records, result.total))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(schema): Extension<Arc<Schema>>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let updating = body.get("id").is_some_and(|id| !id.is_null());
    let stored = CrudService::create(state.store.as_ref(), &schema, body).await?;
    Ok(if updating {
        success_one_ok(stored)
    } else {
        success_one(stored)
    })
}

pub async fn read(
    State(state): State<AppState>,
    Extension(schema): Extension<Arc<Schema>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&schema, &id)?;
    let fields = state.compiler.projection(&params, &schema);
    let record = CrudService::read(state.store.as_ref(), &schema, id, &fields).await?;
    Ok(success_one_ok(record))
}

/// `GET /<collection>/<id>/<segment>/...`: field names and list indexes into the record.
pub async fn read_path(
    State(state): State<AppState>,
    Extension(schema): Extension<Arc<Schema>>,
    Path((id, walk)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&schema, &id)?;
    let segments: Vec<&str> = walk.split('/').filter(|s| !s.is_empty()).collect();
    let value = CrudService::read_path(state.store.as_ref(), &schema, id, &segments).await?;
    Ok(success_one_ok(value))
}

pub async fn replace(
    State(state): State<AppState>,
    Extension(schema): Extension<Arc<Schema>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&schema, &id)?;
    let stored = CrudService::replace(state.store.as_ref(), &schema, id, body).await?;
    Ok(success_one_ok(stored))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(schema): Extension<Arc<Schema>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&schema, &id)?;
    CrudService::delete(state.store.as_ref(), &schema, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
