//! Example consumer: a separate Rust project that declares its records as Rust types.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Or from this directory: `cargo run`

use schemarest::{
    AppState, FieldDef, FieldType, MemoryStore, Query, Repository, SchemaRegistry, ServiceConfig, SortKey,
    StorageBackend, Storable,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Author {
    id: Option<u64>,
    handle: String,
}

impl Storable for Author {
    const NAME: &'static str = "Author";

    fn fields() -> Vec<FieldDef> {
        vec![FieldDef::new("handle", FieldType::String).required()]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    id: Option<u64>,
    /// `authors/<id>`
    author: String,
    body: String,
    likes: i64,
}

impl Storable for Message {
    const NAME: &'static str = "Message";

    fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("author", FieldType::Reference(Author::collection_name())).required(),
            FieldDef::new("body", FieldType::String).required(),
            FieldDef::new("likes", FieldType::Int).with_default(0.into()),
        ]
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("schemarest=info,example_consumer=info")),
        )
        .init();

    let config = ServiceConfig::from_env()?;
    let mut registry = SchemaRegistry::new();
    registry.register_record::<Author>()?;
    registry.register_record::<Message>()?;
    registry.check_references()?;

    let store: Arc<dyn StorageBackend> = Arc::new(MemoryStore::new());
    let authors = Repository::<Author>::new(store.clone());
    let messages = Repository::<Message>::new(store.clone());

    let ada = authors
        .save(&Author {
            id: None,
            handle: "ada".into(),
        })
        .await?;
    for (body, likes) in [("hello", 3), ("notes on the engine", 12)] {
        messages
            .save(&Message {
                id: None,
                author: format!("{}/{}", Author::collection_name(), ada.id.unwrap_or_default()),
                body: body.into(),
                likes,
            })
            .await?;
    }
    let (top, total) = messages.search(&Query::all().sort(SortKey::desc("likes"))).await?;
    tracing::info!(total, top = ?top.first().map(|m| &m.body), "seeded messages");

    let state = AppState::new(registry, store)
        .with_prefix(config.prefix.clone())
        .with_page_size(config.page_size);
    let app = schemarest::app(state, config.body_limit);
    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Example consumer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
