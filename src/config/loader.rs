//! Load schema declarations from JSON on disk and register them.

use crate::config::SchemaDef;
use crate::error::ConfigError;
use crate::registry::SchemaRegistry;
use serde::Deserialize;
use std::path::Path;

/// A declaration file holds either one schema object or an array of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum DeclarationFile {
    Many(Vec<SchemaDef>),
    One(SchemaDef),
}

/// Load declarations from a JSON file, or from every `*.json` in a directory (filename order).
pub async fn load_schema_defs(path: &Path) -> Result<Vec<SchemaDef>, ConfigError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    if !meta.is_dir() {
        return load_file(path).await;
    }

    let mut entries = tokio::fs::read_dir(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ConfigError::Load(e.to_string()))?
    {
        let p = entry.path();
        if p.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(p);
        }
    }
    files.sort();

    let mut defs = Vec::new();
    for file in files {
        defs.extend(load_file(&file).await?);
    }
    Ok(defs)
}

async fn load_file(path: &Path) -> Result<Vec<SchemaDef>, ConfigError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let parsed: DeclarationFile = serde_json::from_str(&raw)
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), "loaded schema declarations");
    Ok(match parsed {
        DeclarationFile::Many(v) => v,
        DeclarationFile::One(d) => vec![d],
    })
}

/// Register every declaration, then check cross-schema references. Fails fast on the first error.
pub fn build_registry(defs: Vec<SchemaDef>) -> Result<SchemaRegistry, ConfigError> {
    let mut registry = SchemaRegistry::new();
    for def in defs {
        registry.register(def)?;
    }
    registry.check_references()?;
    Ok(registry)
}
