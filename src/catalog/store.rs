//! Persistence capability consumed by the catalog core.
//!
//! Implementations must enforce, at the storage level:
//! - unique `isbn` across books, reported as [`StoreError::UniqueViolation`];
//! - `books.author_id` referencing an existing author, with author deletion
//!   refused (never cascaded) while books reference it, reported as
//!   [`StoreError::ForeignKeyViolation`].
//!
//! Application-level pre-checks only produce friendlier errors; these
//! constraints are what actually hold under concurrent writers.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use super::query::QuerySpec;
use crate::modules::authors::models::{Author, AuthorId, AuthorPatch};
use crate::modules::books::models::{Book, BookFilter, BookId, BookPatch, BookRecord};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; carries the backend's description.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("foreign key constraint violated")]
    ForeignKeyViolation,

    /// Anything else: I/O, lock poisoning, corrupt rows.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_author(&self, author: &Author) -> StoreResult<()>;

    async fn get_author(&self, id: AuthorId) -> StoreResult<Option<Author>>;

    /// Matching rows for the requested page plus the total match count.
    async fn query_authors(&self, spec: &QuerySpec<()>) -> StoreResult<(Vec<Author>, u64)>;

    /// Applies the supplied fields; `updated_at` becomes `max(now, previous + 1µs)`.
    /// `None` when no such author exists.
    async fn update_author(
        &self,
        id: AuthorId,
        patch: &AuthorPatch,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Author>>;

    /// `false` when no such author exists.
    async fn delete_author(&self, id: AuthorId) -> StoreResult<bool>;

    async fn insert_book(&self, book: &BookRecord) -> StoreResult<()>;

    /// Book with its author joined.
    async fn get_book(&self, id: BookId) -> StoreResult<Option<Book>>;

    async fn find_book_id_by_isbn(&self, isbn: &str) -> StoreResult<Option<BookId>>;

    async fn query_books(&self, spec: &QuerySpec<BookFilter>) -> StoreResult<(Vec<Book>, u64)>;

    async fn update_book(
        &self,
        id: BookId,
        patch: &BookPatch,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Book>>;

    async fn delete_book(&self, id: BookId) -> StoreResult<bool>;
}
