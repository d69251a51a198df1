//! Structured queries: filter clauses, multi-key sort, paging window and projection.

mod compiler;

pub use compiler::QueryCompiler;

use std::fmt;

/// Default `limit` when the request gives none.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Query-parameter names with fixed meaning; never treated as implicit field filters.
pub const RESERVED_PARAMS: &[&str] = &["filter", "sort", "offset", "limit", "fields"];

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    /// Case-insensitive substring match.
    Contains,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::Contains => "~=",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "==" => Operator::Eq,
            "!=" => Operator::Ne,
            "<" => Operator::Lt,
            ">" => Operator::Gt,
            "<=" => Operator::Le,
            ">=" => Operator::Ge,
            "~=" => Operator::Contains,
            _ => return None,
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(field, operator, value)` triple. The value is kept raw; the storage engine coerces it
/// to the type of the stored field value at comparison time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Clause {
    pub field: String,
    pub op: Operator,
    pub value: String,
}

impl Clause {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<String>) -> Self {
        Clause {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, self.op, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        SortKey { field: field.into(), descending: false }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        SortKey { field: field.into(), descending: true }
    }
}

/// A compiled query against one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// AND-combined clauses, in request order.
    pub filter: Vec<Clause>,
    /// Sort keys in priority order (first = primary).
    pub sort: Vec<SortKey>,
    pub offset: usize,
    /// `None` = no limit.
    pub limit: Option<usize>,
    /// Projection; empty = all fields.
    pub fields: Vec<String>,
}

impl Default for Query {
    fn default() -> Self {
        Query {
            filter: Vec::new(),
            sort: Vec::new(),
            offset: 0,
            limit: Some(DEFAULT_PAGE_SIZE),
            fields: Vec::new(),
        }
    }
}

impl Query {
    /// Unpaged, unfiltered query returning everything.
    pub fn all() -> Self {
        Query { limit: None, ..Query::default() }
    }

    pub fn filter(mut self, clause: Clause) -> Self {
        self.filter.push(clause);
        self
    }

    pub fn sort(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn page(mut self, offset: usize, limit: Option<usize>) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// The part of the query that decides which records match and in which order.
    pub fn cache_key(&self, collection: &str) -> CacheKey {
        CacheKey {
            collection: collection.to_string(),
            filter: self.filter.clone(),
            sort: self.sort.clone(),
        }
    }
}

/// Cache key for a filtered+sorted result list: paging and projection are excluded so one
/// entry serves every page and projection of the same filter+sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub collection: String,
    pub filter: Vec<Clause>,
    pub sort: Vec<SortKey>,
}
