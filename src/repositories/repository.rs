// src/repositories/repository.rs
//
// Storage-agnostic repository contract
//
// RULES:
// - Callers speak in entities and public field names only
// - Absence is Ok(None), never an error
// - Pagination is offset based; cursors are opaque to callers

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::entity::Entity;
use crate::error::AppResult;

/// Page size used by `find` when no limit is given
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

/// Position right after the last record of a page.
///
/// Serialized as an opaque token; only `PageCursor::from_str` reads it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageCursor {
    offset: usize,
}

const CURSOR_PREFIX: &str = "pc_";

impl PageCursor {
    pub(crate) fn at(offset: usize) -> Self {
        Self { offset }
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:x}", CURSOR_PREFIX, self.offset)
    }
}

impl FromStr for PageCursor {
    type Err = String;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        token
            .strip_prefix(CURSOR_PREFIX)
            .and_then(|hex| usize::from_str_radix(hex, 16).ok())
            .map(Self::at)
            .ok_or_else(|| format!("Invalid page cursor: {:?}", token))
    }
}

impl TryFrom<String> for PageCursor {
    type Error = String;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        token.parse()
    }
}

impl From<PageCursor> for String {
    fn from(cursor: PageCursor) -> Self {
        cursor.to_string()
    }
}

/// 1-based page number and page size, converted into limit/skip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn skip(&self) -> usize {
        self.page.saturating_sub(1) * self.page_size
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    /// Partial field match on public field names
    pub filter: Map<String, Value>,
    /// Applied in order, first key is the primary sort
    pub order: Vec<(String, Direction)>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    /// Wins over `skip` when both are set
    pub cursor: Option<PageCursor>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(field.into(), value.into());
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order.push((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn cursor(mut self, cursor: PageCursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn paginate(self, pagination: Pagination) -> Self {
        self.limit(pagination.page_size).skip(pagination.skip())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub page: usize,
    pub page_size: usize,
    pub total: u64,
    pub results: Vec<T>,
    /// Present when more records follow this page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<PageCursor>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            page: self.page,
            page_size: self.page_size,
            total: self.total,
            results: self.results.into_iter().map(f).collect(),
            cursor: self.cursor,
        }
    }
}

/// CRUD and pagination over one entity type.
///
/// `create` and `update` take the caller's entity by `&mut`: it is marked
/// and committed in place, and the stored form is returned separately.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    async fn find_one(&self, options: SearchOptions) -> AppResult<Option<E>>;

    async fn find(&self, options: SearchOptions) -> AppResult<Page<E>>;

    /// Lookup by primary key; malformed keys are simply not found
    async fn find_by_key(&self, key: &str) -> AppResult<Option<E>>;

    async fn create(&self, entity: &mut E) -> AppResult<E>;

    /// Persist the changed fields of a dirty entity. Clean entities are
    /// returned as they are without touching the store.
    async fn update(&self, entity: &mut E) -> AppResult<E>;

    /// Remove every record matching `filter`. An empty filter is refused
    /// unless `force` is set.
    async fn delete(&self, filter: Map<String, Value>, force: bool) -> AppResult<u64>;
}
