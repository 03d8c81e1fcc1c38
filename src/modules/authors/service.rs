use std::sync::Arc;

use crate::catalog::{
    query, timestamp_now, CatalogError, CatalogResult, CatalogStore, Entity, IntegrityGuard, Page,
    PageParams,
};

use super::models::{Author, AuthorId, CreateAuthor, UpdateAuthor};

/// Author operations over a [`CatalogStore`].
#[derive(Clone)]
pub struct AuthorService {
    store: Arc<dyn CatalogStore>,
    guard: IntegrityGuard,
}

impl AuthorService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        let guard = IntegrityGuard::new(store.clone());
        Self { store, guard }
    }

    pub async fn create(&self, input: &CreateAuthor) -> CatalogResult<Author> {
        let new = input.validate()?;
        let now = timestamp_now();
        let author = Author {
            id: AuthorId::generate(),
            first_name: new.first_name,
            last_name: new.last_name,
            bio: new.bio,
            birth_date: new.birth_date,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_author(&author).await?;
        tracing::info!(author_id = %author.id, "author created");
        Ok(author)
    }

    /// Newest first; `search` matches first or last name.
    pub async fn list(&self, params: &PageParams) -> CatalogResult<Page<Author>> {
        let spec = query::plan::<Author, _>(params, ())?;
        let (rows, total) = self.store.query_authors(&spec).await?;
        Ok(spec.page_of(rows, total))
    }

    pub async fn get(&self, id: AuthorId) -> CatalogResult<Author> {
        self.guard.require_author(id).await
    }

    pub async fn update(&self, id: AuthorId, input: &UpdateAuthor) -> CatalogResult<Author> {
        let patch = input.validate()?;
        let updated = self
            .store
            .update_author(id, &patch, timestamp_now())
            .await?
            .ok_or_else(|| CatalogError::not_found(Entity::Author, id))?;

        tracing::info!(author_id = %id, "author updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: AuthorId) -> CatalogResult<()> {
        self.guard.delete_author(id).await
    }
}
