//! Pagination and search planning.
//!
//! [`plan`] turns raw page/limit/search parameters into a bounded
//! [`QuerySpec`]; the store executes it and [`QuerySpec::page_of`] wraps the
//! rows. Ordering is always `created_at DESC, id ASC` so pages never overlap
//! or skip rows when creation timestamps collide.

use serde::{Deserialize, Serialize};

use super::error::{CatalogError, CatalogResult, Violation};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Fields a free-text search may match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    FirstName,
    LastName,
    Title,
    Isbn,
}

/// Entities that can be listed with a free-text search.
pub trait Searchable {
    /// Matched case-insensitively as substrings, combined with OR.
    const SEARCH_FIELDS: &'static [SearchField];
}

/// Raw listing parameters, all optional. Signed so that negative values
/// reach [`plan`] and fail as field violations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    /// Trimmed, never empty. Matched literally; `%` and `_` are not wildcards.
    pub needle: String,
    pub fields: &'static [SearchField],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// `created_at` descending, then `id` ascending.
    #[default]
    NewestFirst,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec<F> {
    pub page: u32,
    pub limit: u32,
    pub offset: u64,
    pub search: Option<Search>,
    pub filter: F,
    pub order: SortOrder,
}

/// One page of results plus the total match count across all pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<F> QuerySpec<F> {
    pub fn page_of<T>(&self, data: Vec<T>, total: u64) -> Page<T> {
        Page {
            data,
            total,
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Build a bounded query plan for entity `T` with equality `filter`.
pub fn plan<T: Searchable, F>(params: &PageParams, filter: F) -> CatalogResult<QuerySpec<F>> {
    let mut violations = Vec::new();

    let page = bounded(params.page, DEFAULT_PAGE, u32::MAX);
    if page.is_none() {
        violations.push(Violation::new(
            "page",
            format!("must be between 1 and {}", u32::MAX),
        ));
    }

    let limit = bounded(params.limit, DEFAULT_LIMIT, MAX_LIMIT);
    if limit.is_none() {
        violations.push(Violation::new(
            "limit",
            format!("must be between 1 and {MAX_LIMIT}"),
        ));
    }

    let (Some(page), Some(limit)) = (page, limit) else {
        return Err(CatalogError::InvalidInput(violations));
    };

    let search = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|needle| !needle.is_empty())
        .map(|needle| Search {
            needle: needle.to_string(),
            fields: T::SEARCH_FIELDS,
        });

    Ok(QuerySpec {
        page,
        limit,
        offset: u64::from(page - 1) * u64::from(limit),
        search,
        filter,
        order: SortOrder::NewestFirst,
    })
}

/// `default` when absent, `None` when outside `1..=max`.
fn bounded(raw: Option<i64>, default: u32, max: u32) -> Option<u32> {
    match raw {
        None => Some(default),
        Some(raw) => u32::try_from(raw).ok().filter(|value| (1..=max).contains(value)),
    }
}
