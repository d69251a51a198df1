use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use schemarest::{AppState, FieldDef, FieldType, MemoryStore, SchemaDef, SchemaRegistry};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn registry() -> SchemaRegistry {
    let mut reg = SchemaRegistry::new();
    reg.register(SchemaDef::new(
        "User",
        vec![
            FieldDef::new("name", FieldType::String).required(),
            FieldDef::new("age", FieldType::Int),
        ],
    ))
    .unwrap();
    reg.register(SchemaDef::new(
        "Company",
        vec![
            FieldDef::new("name", FieldType::String).required(),
            FieldDef::new(
                "offices",
                FieldType::List(Box::new(FieldType::Nested(vec![FieldDef::new(
                    "city",
                    FieldType::String,
                )
                .required()]))),
            ),
        ],
    ))
    .unwrap();
    reg
}

fn app_with(prefix: &str, body_limit: usize) -> Router {
    let state = AppState::new(registry(), Arc::new(MemoryStore::new())).with_prefix(prefix);
    schemarest::app(state, body_limit)
}

fn app() -> Router {
    app_with("/", 1024 * 1024)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, HeaderMap, Value) {
    let bytes = body.map(|v| serde_json::to_vec(&v).unwrap());
    send_raw(app, method, uri, bytes, false).await
}

async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Vec<u8>>,
    with_length: bool,
) -> (StatusCode, HeaderMap, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(bytes) => {
            req = req.header("content-type", "application/json");
            if with_length {
                req = req.header("content-length", bytes.len());
            }
            Body::from(bytes)
        }
        None => Body::empty(),
    };
    let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|e| panic!("{}: {:?}", e, bytes))
    };
    (status, headers, json)
}

async fn create_user(app: &Router, name: &str, age: i64) -> u64 {
    let (status, _, body) = send(app, Method::POST, "/users", Some(json!({"name": name, "age": age}))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["id"].as_u64().unwrap()
}

fn ages(body: &Value) -> Vec<i64> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["age"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn filter_sort_delete_scenario() {
    let app = app();
    create_user(&app, "a", 20).await;
    let id25 = create_user(&app, "b", 25).await;
    create_user(&app, "c", 30).await;

    let uri = "/users?filter=age%3E%3D25&sort=-age";
    let (status, headers, body) = send(&app, Method::GET, uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ages(&body), [30, 25]);
    assert_eq!(headers["x-total-count"], "2");

    let (status, _, body) = send(&app, Method::DELETE, &format!("/users/{}", id25), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (_, headers, body) = send(&app, Method::GET, uri, None).await;
    assert_eq!(ages(&body), [30]);
    assert_eq!(headers["x-total-count"], "1");
}

#[tokio::test]
async fn implicit_field_filters_and_paging() {
    let app = app();
    for (name, age) in [("a", 20), ("b", 30), ("c", 30), ("d", 30)] {
        create_user(&app, name, age).await;
    }
    let (_, headers, body) = send(&app, Method::GET, "/users/?age=30&sort=name&offset=1&limit=1", None).await;
    assert_eq!(body["data"][0]["name"], json!("c"));
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(headers["x-total-count"], "3");

    let (_, _, body) = send(&app, Method::GET, "/users?fields=name&limit=0", None).await;
    let first = body["data"][0].as_object().unwrap();
    assert!(first.contains_key("id") && first.contains_key("name"));
    assert!(!first.contains_key("age"));
    assert_eq!(body["data"].as_array().unwrap().len(), 4);

    let (_, _, body) = send(&app, Method::GET, "/users?fields=id&sort=id&limit=1", None).await;
    assert_eq!(body["data"], json!([{"id": 1}]));
}

#[tokio::test]
async fn unknown_ids_are_404_and_put_never_creates() {
    let app = app();
    let (status, _, body) = send(&app, Method::GET, "/users/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("not_found"));

    let (status, _, _) = send(&app, Method::PUT, "/users/9999", Some(json!({"name": "x", "age": 1}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = send(&app, Method::DELETE, "/users/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, headers, _) = send(&app, Method::GET, "/users", None).await;
    assert_eq!(headers["x-total-count"], "0");
}

#[tokio::test]
async fn put_replaces_and_round_trips() {
    let app = app();
    let id = create_user(&app, "ada", 36).await;
    let (_, _, fetched) = send(&app, Method::GET, &format!("/users/{}", id), None).await;

    let (status, _, replaced) = send(&app, Method::PUT, &format!("/users/{}", id), Some(fetched["data"].clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["data"], fetched["data"]);

    let (status, _, _) = send(&app, Method::PUT, &format!("/users/{}", id), Some(json!({"id": id + 1, "name": "x"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // POST with an id updates the existing record
    let (status, _, body) = send(&app, Method::POST, "/users", Some(json!({"id": id, "name": "ada", "age": 37}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["age"], json!(37));
}

#[tokio::test]
async fn malformed_queries_are_400() {
    let app = app();
    create_user(&app, "a", 20).await;
    let (status, _, _) = send(&app, Method::GET, "/users?limit=ten", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, body) = send(&app, Method::GET, "/users?filter=age%3Cold", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("age<old"));

    // unparseable clauses are dropped rather than rejected
    let (status, headers, _) = send(&app, Method::GET, "/users?filter=nonsense", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-total-count"], "1");
}

#[tokio::test]
async fn invalid_bodies_are_422() {
    let app = app();
    let (status, _, body) = send(&app, Method::POST, "/users", Some(json!({"age": 3}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], json!("validation_error"));
    let (status, _, _) = send(&app, Method::POST, "/users", Some(json!({"name": "a", "height": 3}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _, _) = send(&app, Method::POST, "/users", Some(json!({"name": "a", "age": "old"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _, body) = send_raw(&app, Method::POST, "/users", Some(b"{bad".to_vec()), true).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], json!("validation_error"));
}

#[tokio::test]
async fn path_walk_into_nested_values() {
    let app = app();
    let body = json!({"name": "Acme", "offices": [{"city": "Oslo"}, {"city": "Lima"}]});
    let (status, _, created) = send(&app, Method::POST, "/companies", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["data"]["id"].as_u64().unwrap();

    let (status, _, body) = send(&app, Method::GET, &format!("/companies/{}/offices/1/city", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"data": "Lima"}));

    let (status, _, body) = send(&app, Method::GET, &format!("/companies/{}/offices/4/city", id), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["message"].as_str().unwrap().contains("'offices/4'"));

    let (status, _, _) = send(&app, Method::GET, "/companies/77/offices", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn discovery_routes() {
    let app = app_with("/api/", 1024 * 1024);
    let (status, _, doc) = send(&app, Method::GET, "/api/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/users/{id}"]["put"].is_object());
    assert!(doc["components"]["schemas"]["Company"]["properties"]["offices"].is_object());

    let (_, _, index) = send(&app, Method::GET, "/api/routes", None).await;
    let gets = index["data"]["users"]["GET"].as_array().unwrap();
    assert!(gets.contains(&json!("/api/users")));
    assert_eq!(index["data"]["companies"]["DELETE"], json!(["/api/companies/:id"]));

    let (status, _, _) = send(&app, Method::GET, "/users", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["collections"], json!(["users", "companies"]));
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let app = app_with("/", 64);
    let big = "x".repeat(256);
    let body = serde_json::to_vec(&json!({"name": big})).unwrap();

    // without a length header the limit trips while the body is read
    let (status, _, err) = send_raw(&app, Method::POST, "/users", Some(body.clone()), false).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(err["error"]["code"], json!("payload_too_large"));

    let (status, _, err) = send_raw(&app, Method::POST, "/users", Some(body), true).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(err["error"]["code"], json!("payload_too_large"));

    let (status, _, _) = send(&app, Method::POST, "/users", Some(json!({"name": "ok"}))).await;
    assert_eq!(status, StatusCode::CREATED);
}
