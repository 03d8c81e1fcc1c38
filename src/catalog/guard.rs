//! Cross-record integrity: author existence, ISBN uniqueness, delete order.
//!
//! Every mutation runs the cheap pre-checks first for a precise error, then
//! lets the store's own constraints decide. A constraint failure that slips
//! past a pre-check (concurrent writer) is translated to the same error kind
//! the pre-check would have produced.

use std::sync::Arc;

use time::OffsetDateTime;

use super::error::{CatalogError, CatalogResult, Entity};
use super::store::{CatalogStore, StoreError};
use crate::modules::authors::models::{Author, AuthorId};
use crate::modules::books::models::{Book, BookId, BookPatch, BookRecord};

#[derive(Clone)]
pub struct IntegrityGuard {
    store: Arc<dyn CatalogStore>,
}

impl IntegrityGuard {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn require_author(&self, id: AuthorId) -> CatalogResult<Author> {
        self.store
            .get_author(id)
            .await?
            .ok_or_else(|| CatalogError::not_found(Entity::Author, id))
    }

    pub async fn require_book(&self, id: BookId) -> CatalogResult<Book> {
        self.store
            .get_book(id)
            .await?
            .ok_or_else(|| CatalogError::not_found(Entity::Book, id))
    }

    async fn ensure_author_reference(&self, author_id: AuthorId) -> CatalogResult<()> {
        if self.store.get_author(author_id).await?.is_none() {
            tracing::info!(author_id = %author_id, "rejecting book: author does not exist");
            return Err(reference_not_found(author_id));
        }
        Ok(())
    }

    async fn ensure_isbn_available(&self, isbn: &str, owner: Option<BookId>) -> CatalogResult<()> {
        match self.store.find_book_id_by_isbn(isbn).await? {
            Some(existing) if Some(existing) != owner => {
                tracing::info!(isbn, existing_book = %existing, "rejecting book: isbn taken");
                Err(isbn_taken(isbn))
            }
            _ => Ok(()),
        }
    }

    /// Author must exist, ISBN must be free, then insert.
    pub async fn create_book(&self, record: &BookRecord) -> CatalogResult<Book> {
        self.ensure_author_reference(record.author_id).await?;
        self.ensure_isbn_available(&record.isbn, None).await?;

        self.store
            .insert_book(record)
            .await
            .map_err(|err| translate_book_write(err, &record.isbn, record.author_id))?;

        tracing::info!(book_id = %record.id, isbn = %record.isbn, "book created");
        self.require_book(record.id).await
    }

    /// Re-checks only what the patch changes.
    pub async fn update_book(
        &self,
        id: BookId,
        patch: &BookPatch,
        now: OffsetDateTime,
    ) -> CatalogResult<Book> {
        let current = self.require_book(id).await?;

        if let Some(author_id) = patch.author_id {
            self.ensure_author_reference(author_id).await?;
        }
        if let Some(isbn) = patch.isbn.as_deref().filter(|isbn| *isbn != current.isbn) {
            self.ensure_isbn_available(isbn, Some(id)).await?;
        }

        let updated = self
            .store
            .update_book(id, patch, now)
            .await
            .map_err(|err| {
                let isbn = patch.isbn.as_deref().unwrap_or(&current.isbn);
                translate_book_write(err, isbn, patch.author_id.unwrap_or(current.author_id))
            })?;

        updated.ok_or_else(|| CatalogError::not_found(Entity::Book, id))
    }

    /// Refused while any book still references the author.
    pub async fn delete_author(&self, id: AuthorId) -> CatalogResult<()> {
        match self.store.delete_author(id).await {
            Ok(true) => {
                tracing::info!(author_id = %id, "author deleted");
                Ok(())
            }
            Ok(false) => Err(CatalogError::not_found(Entity::Author, id)),
            Err(StoreError::ForeignKeyViolation) => {
                tracing::warn!(author_id = %id, "author delete blocked by dependent books");
                Err(CatalogError::DependencyConflict { id: id.to_string() })
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete_book(&self, id: BookId) -> CatalogResult<()> {
        if !self.store.delete_book(id).await? {
            return Err(CatalogError::not_found(Entity::Book, id));
        }
        tracing::info!(book_id = %id, "book deleted");
        Ok(())
    }
}

fn reference_not_found(author_id: AuthorId) -> CatalogError {
    CatalogError::ReferenceNotFound {
        field: "authorId",
        id: author_id.to_string(),
    }
}

fn isbn_taken(isbn: &str) -> CatalogError {
    CatalogError::UniquenessViolation {
        field: "isbn",
        value: isbn.to_string(),
    }
}

fn translate_book_write(err: StoreError, isbn: &str, author_id: AuthorId) -> CatalogError {
    match err {
        StoreError::UniqueViolation(constraint) => {
            tracing::warn!(isbn, %constraint, "isbn claimed concurrently");
            isbn_taken(isbn)
        }
        StoreError::ForeignKeyViolation => {
            tracing::warn!(author_id = %author_id, "author removed concurrently");
            reference_not_found(author_id)
        }
        other => {
            tracing::error!(error = %other, "book write failed");
            other.into()
        }
    }
}
