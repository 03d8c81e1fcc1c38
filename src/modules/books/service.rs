use std::sync::Arc;

use crate::catalog::{
    query, timestamp_now, CatalogResult, CatalogStore, IntegrityGuard, Page, PageParams,
};

use super::models::{Book, BookFilter, BookId, BookRecord, CreateBook, UpdateBook};

/// Book operations; every write goes through the [`IntegrityGuard`].
#[derive(Clone)]
pub struct BookService {
    store: Arc<dyn CatalogStore>,
    guard: IntegrityGuard,
}

impl BookService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        let guard = IntegrityGuard::new(store.clone());
        Self { store, guard }
    }

    pub async fn create(&self, input: &CreateBook) -> CatalogResult<Book> {
        let new = input.validate()?;
        let now = timestamp_now();
        let record = BookRecord {
            id: BookId::generate(),
            title: new.title,
            isbn: new.isbn,
            published_date: new.published_date,
            genre: new.genre,
            author_id: new.author_id,
            created_at: now,
            updated_at: now,
        };
        self.guard.create_book(&record).await
    }

    /// Newest first; `search` matches title or ISBN, `filter` narrows by author.
    pub async fn list(&self, params: &PageParams, filter: BookFilter) -> CatalogResult<Page<Book>> {
        let spec = query::plan::<Book, _>(params, filter)?;
        let (rows, total) = self.store.query_books(&spec).await?;
        Ok(spec.page_of(rows, total))
    }

    pub async fn get(&self, id: BookId) -> CatalogResult<Book> {
        self.guard.require_book(id).await
    }

    pub async fn update(&self, id: BookId, input: &UpdateBook) -> CatalogResult<Book> {
        let patch = input.validate()?;
        let book = self.guard.update_book(id, &patch, timestamp_now()).await?;
        tracing::info!(book_id = %id, "book updated");
        Ok(book)
    }

    pub async fn delete(&self, id: BookId) -> CatalogResult<()> {
        self.guard.delete_book(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ErrorKind, SqliteCatalogStore};
    use crate::modules::authors::models::CreateAuthor;
    use crate::modules::authors::service::AuthorService;

    async fn setup() -> (AuthorService, BookService, String) {
        let store: Arc<dyn CatalogStore> = Arc::new(SqliteCatalogStore::open_in_memory().unwrap());
        let authors = AuthorService::new(store.clone());
        let books = BookService::new(store);
        let author = authors
            .create(&CreateAuthor {
                first_name: "Ursula".into(),
                last_name: "Le Guin".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        (authors, books, author.id.to_string())
    }

    fn input(author_id: &str, title: &str, isbn: &str) -> CreateBook {
        CreateBook {
            title: title.into(),
            isbn: isbn.into(),
            author_id: author_id.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn created_book_carries_its_author() {
        let (_, books, author_id) = setup().await;
        let book = books
            .create(&input(&author_id, "The Lathe of Heaven", "978-0-306-40615-7"))
            .await
            .unwrap();
        assert_eq!(book.isbn, "9780306406157");
        assert_eq!(book.author.last_name, "Le Guin");
        assert_eq!(books.get(book.id).await.unwrap(), book);
    }

    #[tokio::test]
    async fn hyphenated_and_compact_isbn_collide() {
        let (_, books, author_id) = setup().await;
        books
            .create(&input(&author_id, "First", "0-306-40615-2"))
            .await
            .unwrap();
        let err = books
            .create(&input(&author_id, "Second", "0306406152"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UniquenessViolation);
    }

    #[tokio::test]
    async fn unknown_author_is_a_reference_error() {
        let (_, books, _) = setup().await;
        let err = books
            .create(&input(
                "0190f1c4-8b5e-7c3a-9a3e-2f1d5c6b7a80",
                "Orphan",
                "9780306406157",
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReferenceNotFound);
    }

    #[tokio::test]
    async fn update_can_keep_own_isbn_but_not_take_another() {
        let (_, books, author_id) = setup().await;
        let first = books
            .create(&input(&author_id, "First", "9780306406157"))
            .await
            .unwrap();
        books
            .create(&input(&author_id, "Second", "0306406152"))
            .await
            .unwrap();

        let same = UpdateBook {
            isbn: Some("978-0306406157".into()),
            title: Some("First, revised".into()),
            ..Default::default()
        };
        let updated = books.update(first.id, &same).await.unwrap();
        assert_eq!(updated.title, "First, revised");

        let taken = UpdateBook {
            isbn: Some("0306406152".into()),
            ..Default::default()
        };
        let err = books.update(first.id, &taken).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UniquenessViolation);
    }

    #[tokio::test]
    async fn list_filters_by_author_and_searches_isbn() {
        let (authors, books, author_id) = setup().await;
        let other = authors
            .create(&CreateAuthor {
                first_name: "Iain".into(),
                last_name: "Banks".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        books
            .create(&input(&author_id, "The Word for World Is Forest", "9780306406157"))
            .await
            .unwrap();
        books
            .create(&input(&other.id.to_string(), "Excession", "0306406152"))
            .await
            .unwrap();

        let filter = BookFilter {
            author_id: Some(other.id),
        };
        let page = books.list(&PageParams::default(), filter).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].title, "Excession");

        let page = books
            .list(
                &PageParams {
                    search: Some("978-0-306".into()),
                    ..Default::default()
                },
                BookFilter::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].isbn, "9780306406157");
    }
}
