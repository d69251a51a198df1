//! Compiles flat request parameters (`filter`, `sort`, `offset`, `limit`, `fields`, `<field>=v`)
//! into a [`Query`] validated against a schema.
//!
//! Parsing is lenient: filter clauses that do not parse, and filter/sort/projection entries naming
//! unknown fields, are dropped with a warning. Only structurally invalid paging values fail.

use crate::error::AppError;
use crate::query::{Clause, Operator, Query, SortKey, DEFAULT_PAGE_SIZE, RESERVED_PARAMS};
use crate::registry::Schema;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn clause_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*(==|!=|<=|>=|~=|<|>)(.*)$").expect("static regex")
    })
}

#[derive(Debug, Clone, Copy)]
pub struct QueryCompiler {
    page_size: usize,
}

impl Default for QueryCompiler {
    fn default() -> Self {
        QueryCompiler { page_size: DEFAULT_PAGE_SIZE }
    }
}

impl QueryCompiler {
    pub fn new(page_size: usize) -> Self {
        QueryCompiler { page_size }
    }

    pub fn compile(&self, params: &HashMap<String, String>, schema: &Schema) -> Result<Query, AppError> {
        let mut filter = params
            .get("filter")
            .map(|raw| parse_filter(raw, schema))
            .unwrap_or_default();

        // `?age=10` is shorthand for `filter=age==10`; declaration order keeps the cache key stable.
        let implicit = std::iter::once("id").chain(schema.fields().iter().map(|f| f.name.as_str()));
        for name in implicit {
            if RESERVED_PARAMS.contains(&name) {
                continue;
            }
            if let Some(v) = params.get(name) {
                filter.push(Clause::new(name, Operator::Eq, v.as_str()));
            }
        }

        let sort = params
            .get("sort")
            .map(|raw| parse_sort(raw, schema))
            .unwrap_or_default();
        let fields = params
            .get("fields")
            .map(|raw| parse_fields(raw, schema))
            .unwrap_or_default();

        let offset = match params.get("offset") {
            Some(raw) => {
                let n = parse_int("offset", raw)?;
                usize::try_from(n)
                    .map_err(|_| AppError::BadRequest(format!("offset must be non-negative, got {}", n)))?
            }
            None => 0,
        };
        let limit = match params.get("limit") {
            // zero or negative: no limit
            Some(raw) => usize::try_from(parse_int("limit", raw)?).ok().filter(|&n| n > 0),
            None => Some(self.page_size).filter(|&n| n > 0),
        };

        let query = Query {
            filter,
            sort,
            offset,
            limit,
            fields,
        };
        tracing::debug!(collection = %schema.collection_name(), ?query, "compiled query");
        Ok(query)
    }

    /// Only the `fields` projection, for single-record reads.
    pub fn projection(&self, params: &HashMap<String, String>, schema: &Schema) -> Vec<String> {
        params
            .get("fields")
            .map(|raw| parse_fields(raw, schema))
            .unwrap_or_default()
    }
}

fn parse_int(name: &str, raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest(format!("{} must be an integer, got '{}'", name, raw)))
}

fn parse_filter(raw: &str, schema: &Schema) -> Vec<Clause> {
    let mut clauses = Vec::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let Some(caps) = clause_re().captures(part) else {
            tracing::warn!(clause = %part, "dropping unparseable filter clause");
            continue;
        };
        let field = &caps[1];
        if !schema.has_field(field) {
            tracing::warn!(clause = %part, "dropping filter clause on unknown field");
            continue;
        }
        let Some(op) = Operator::parse(&caps[2]) else {
            continue;
        };
        clauses.push(Clause::new(field, op, caps[3].trim()));
    }
    clauses
}

fn parse_sort(raw: &str, schema: &Schema) -> Vec<SortKey> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            let (name, descending) = match s.strip_prefix('-') {
                Some(rest) => (rest, true),
                None => (s.strip_prefix('+').unwrap_or(s), false),
            };
            if schema.has_field(name) {
                Some(SortKey {
                    field: name.to_string(),
                    descending,
                })
            } else {
                tracing::warn!(field = %name, "dropping sort key on unknown field");
                None
            }
        })
        .collect()
}

fn parse_fields(raw: &str, schema: &Schema) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim) {
        let known = name == "id" || schema.field(name).is_some();
        if known && !out.iter().any(|f| f == name) {
            out.push(name.to_string());
        }
    }
    out
}
