//! Service settings from environment (`SCHEMAREST_*`). Call `dotenvy::dotenv()` first to honour a `.env` file.

use crate::error::ConfigError;
use crate::query::DEFAULT_PAGE_SIZE;
use std::path::PathBuf;

pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// URL prefix for every generated route; always starts and ends with `/`.
    pub prefix: String,
    pub bind_addr: String,
    /// Schema declarations: a JSON file or a directory of JSON files.
    pub schema_path: PathBuf,
    /// When set, the durable file-backed store is used; otherwise everything stays in memory.
    pub data_dir: Option<PathBuf>,
    pub page_size: usize,
    pub body_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            prefix: "/".into(),
            bind_addr: "0.0.0.0:3000".into(),
            schema_path: PathBuf::from("schemas"),
            data_dir: None,
            page_size: DEFAULT_PAGE_SIZE,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment in production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ServiceConfig::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Ok(ServiceConfig {
            prefix: normalize_prefix(&get("SCHEMAREST_PREFIX").unwrap_or(defaults.prefix)),
            bind_addr: get("SCHEMAREST_BIND").unwrap_or(defaults.bind_addr),
            schema_path: get("SCHEMAREST_SCHEMAS")
                .map(PathBuf::from)
                .unwrap_or(defaults.schema_path),
            data_dir: get("SCHEMAREST_DATA_DIR").map(PathBuf::from),
            page_size: parse_usize("SCHEMAREST_PAGE_SIZE", get("SCHEMAREST_PAGE_SIZE"), defaults.page_size)?,
            body_limit: parse_usize("SCHEMAREST_BODY_LIMIT", get("SCHEMAREST_BODY_LIMIT"), defaults.body_limit)?,
        })
    }
}

fn parse_usize(key: &str, raw: Option<String>, default: usize) -> Result<usize, ConfigError> {
    match raw {
        None => Ok(default),
        Some(s) => s
            .trim()
            .parse()
            .map_err(|_| ConfigError::Validation(format!("{} must be a non-negative integer, got '{}'", key, s))),
    }
}

/// "api" -> "/api/", "/" -> "/", "/v1/api" -> "/v1/api/"
pub fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".into()
    } else {
        format!("/{}/", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn prefix_is_normalized() {
        assert_eq!(normalize_prefix(""), "/");
        assert_eq!(normalize_prefix("/"), "/");
        assert_eq!(normalize_prefix("backend"), "/backend/");
        assert_eq!(normalize_prefix("/v1/api/"), "/v1/api/");
    }

    #[test]
    fn reads_overrides_and_defaults() {
        let env: HashMap<&str, &str> = [
            ("SCHEMAREST_PREFIX", "backend"),
            ("SCHEMAREST_PAGE_SIZE", "5"),
            ("SCHEMAREST_DATA_DIR", "/tmp/data"),
        ]
        .into_iter()
        .collect();
        let cfg = ServiceConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.prefix, "/backend/");
        assert_eq!(cfg.page_size, 5);
        assert_eq!(cfg.data_dir, Some(PathBuf::from("/tmp/data")));
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.body_limit, DEFAULT_BODY_LIMIT);
    }

    #[test]
    fn rejects_non_numeric_page_size() {
        let err = ServiceConfig::from_lookup(|k| (k == "SCHEMAREST_PAGE_SIZE").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
