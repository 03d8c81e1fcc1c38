//! SQLite-backed [`CatalogStore`].
//!
//! One connection behind a mutex: every trait call is a single critical
//! section, so a page query's row fetch and count always agree.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Type, Value};
use rusqlite::{ffi, params, params_from_iter, Connection, OptionalExtension, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dates;
use super::query::{QuerySpec, Search, SearchField, SortOrder};
use super::store::{CatalogStore, StoreError, StoreResult};
use crate::modules::authors::models::{Author, AuthorId, AuthorPatch};
use crate::modules::books::models::{Book, BookFilter, BookId, BookPatch, BookRecord};
use crate::utils::isbn;
use catalog_kernel::settings::DatabaseSettings;

const AUTHOR_COLUMNS: &str = "id, first_name, last_name, bio, birth_date, created_at, updated_at";

const BOOK_SELECT_SQL: &str = "SELECT
    b.id, b.title, b.isbn, b.published_date, b.genre, b.author_id, b.created_at, b.updated_at,
    a.id, a.first_name, a.last_name, a.bio, a.birth_date, a.created_at, a.updated_at
FROM books b
INNER JOIN authors a ON a.id = b.author_id";

/// SQL function that lowercases text with full Unicode case mapping.
const FOLD_FN: &str = "catalog_fold";

/// Column offset of the joined author within a book row.
const BOOK_AUTHOR_OFFSET: usize = 8;

#[derive(Clone)]
pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogStore {
    /// Wraps a connection that already has the catalog schema applied.
    pub fn new(conn: Connection) -> anyhow::Result<Self> {
        register_fold(&conn).context("failed to register search fold function")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens the configured database and applies pending module migrations.
    pub fn open(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let migrations = crate::modules::schema_migrations();
        let conn = if settings.is_in_memory() {
            catalog_db::open_in_memory(&migrations)
        } else {
            catalog_db::open(&settings.path, &migrations)
        }
        .with_context(|| format!("failed to open catalog database '{}'", settings.path))?;
        Self::new(conn)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = catalog_db::open_in_memory(&crate::modules::schema_migrations())
            .context("failed to open in-memory catalog database")?;
        Self::new(conn)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> StoreResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Backend(anyhow!("sqlite connection lock poisoned")))?;
        f(&conn).map_err(map_sqlite_error)
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn insert_author(&self, author: &Author) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!("INSERT INTO authors ({AUTHOR_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);"),
                params![
                    author.id.to_string(),
                    author.first_name,
                    author.last_name,
                    author.bio,
                    author.birth_date.map(dates::format),
                    to_micros(author.created_at),
                    to_micros(author.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    async fn get_author(&self, id: AuthorId) -> StoreResult<Option<Author>> {
        self.with_conn(|conn| select_author(conn, id))
    }

    async fn query_authors(&self, spec: &QuerySpec<()>) -> StoreResult<(Vec<Author>, u64)> {
        let mut clause = WhereClause::default();
        if let Some(search) = &spec.search {
            clause.search(search, "");
        }

        self.with_conn(|conn| {
            let total = count(conn, "SELECT COUNT(*) FROM authors", &clause)?;
            let sql = format!(
                "SELECT {AUTHOR_COLUMNS} FROM authors{} {} LIMIT ? OFFSET ?",
                clause.sql(),
                order_by(spec.order, "")
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(clause.paged(spec)), |row| author_from_row(row, 0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok((rows, total))
        })
    }

    async fn update_author(
        &self,
        id: AuthorId,
        patch: &AuthorPatch,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Author>> {
        let mut update = SetClause::default();
        update.text("first_name", patch.first_name.as_deref());
        update.text("last_name", patch.last_name.as_deref());
        update.text("bio", patch.bio.as_deref());
        update.text("birth_date", patch.birth_date.map(dates::format).as_deref());

        self.with_conn(|conn| {
            if update.execute(conn, "authors", &id.to_string(), now)? == 0 {
                return Ok(None);
            }
            select_author(conn, id)
        })
    }

    async fn delete_author(&self, id: AuthorId) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM authors WHERE id = ?1;", [id.to_string()])?;
            Ok(deleted > 0)
        })
    }

    async fn insert_book(&self, book: &BookRecord) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO books (
                    id, title, isbn, published_date, genre, author_id, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                params![
                    book.id.to_string(),
                    book.title,
                    book.isbn,
                    book.published_date.map(dates::format),
                    book.genre,
                    book.author_id.to_string(),
                    to_micros(book.created_at),
                    to_micros(book.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    async fn get_book(&self, id: BookId) -> StoreResult<Option<Book>> {
        self.with_conn(|conn| select_book(conn, id))
    }

    async fn find_book_id_by_isbn(&self, isbn: &str) -> StoreResult<Option<BookId>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT id FROM books WHERE isbn = ?1;", [isbn], |row| {
                uuid_column(row, 0).map(BookId::from)
            })
            .optional()
        })
    }

    async fn query_books(&self, spec: &QuerySpec<BookFilter>) -> StoreResult<(Vec<Book>, u64)> {
        let mut clause = WhereClause::default();
        if let Some(search) = &spec.search {
            clause.search(search, "b.");
        }
        if let Some(author_id) = spec.filter.author_id {
            clause.equals("b.author_id", author_id.to_string());
        }

        self.with_conn(|conn| {
            let total = count(conn, "SELECT COUNT(*) FROM books b", &clause)?;
            let sql = format!(
                "{BOOK_SELECT_SQL}{} {} LIMIT ? OFFSET ?",
                clause.sql(),
                order_by(spec.order, "b.")
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(clause.paged(spec)), book_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok((rows, total))
        })
    }

    async fn update_book(
        &self,
        id: BookId,
        patch: &BookPatch,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Book>> {
        let mut update = SetClause::default();
        update.text("title", patch.title.as_deref());
        update.text("isbn", patch.isbn.as_deref());
        update.text("author_id", patch.author_id.map(|a| a.to_string()).as_deref());
        update.text("published_date", patch.published_date.map(dates::format).as_deref());
        update.text("genre", patch.genre.as_deref());

        self.with_conn(|conn| {
            if update.execute(conn, "books", &id.to_string(), now)? == 0 {
                return Ok(None);
            }
            select_book(conn, id)
        })
    }

    async fn delete_book(&self, id: BookId) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM books WHERE id = ?1;", [id.to_string()])?;
            Ok(deleted > 0)
        })
    }
}

/// `WHERE` fragments ANDed together, with their positional bind values.
#[derive(Default)]
struct WhereClause {
    conditions: Vec<String>,
    values: Vec<Value>,
}

impl WhereClause {
    fn search(&mut self, search: &Search, qualifier: &str) {
        let alternatives: Vec<String> = search
            .fields
            .iter()
            .map(|field| {
                let needle = match field {
                    // Stored ISBNs are compact; a separator-only needle stays literal.
                    SearchField::Isbn => Some(isbn::compact(&search.needle))
                        .filter(|compacted| !compacted.is_empty())
                        .unwrap_or_else(|| search.needle.clone()),
                    _ => search.needle.clone(),
                };
                self.values
                    .push(Value::Text(format!("%{}%", escape_like(&needle.to_lowercase()))));
                format!(
                    "{FOLD_FN}({qualifier}{}) LIKE ? ESCAPE '\\'",
                    search_column(*field)
                )
            })
            .collect();
        self.conditions.push(format!("({})", alternatives.join(" OR ")));
    }

    fn equals(&mut self, column: &str, value: String) {
        self.conditions.push(format!("{column} = ?"));
        self.values.push(Value::Text(value));
    }

    fn sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    fn paged<F>(&self, spec: &QuerySpec<F>) -> Vec<Value> {
        let mut values = self.values.clone();
        values.push(Value::Integer(i64::from(spec.limit)));
        values.push(Value::Integer(i64::try_from(spec.offset).unwrap_or(i64::MAX)));
        values
    }
}

/// `SET` assignments for a partial update; `updated_at` is always bumped.
#[derive(Default)]
struct SetClause {
    assignments: Vec<&'static str>,
    values: Vec<Value>,
}

impl SetClause {
    fn text(&mut self, column: &'static str, value: Option<&str>) {
        if let Some(value) = value {
            self.assignments.push(column);
            self.values.push(Value::Text(value.to_string()));
        }
    }

    fn execute(
        &self,
        conn: &Connection,
        table: &str,
        id: &str,
        now: OffsetDateTime,
    ) -> rusqlite::Result<usize> {
        let mut sets: Vec<String> = self
            .assignments
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect();
        sets.push("updated_at = MAX(?, updated_at + 1)".to_string());

        let mut values = self.values.clone();
        values.push(Value::Integer(to_micros(now)));
        values.push(Value::Text(id.to_string()));

        let sql = format!("UPDATE {table} SET {} WHERE id = ?", sets.join(", "));
        conn.execute(&sql, params_from_iter(values))
    }
}

fn search_column(field: SearchField) -> &'static str {
    match field {
        SearchField::FirstName => "first_name",
        SearchField::LastName => "last_name",
        SearchField::Title => "title",
        SearchField::Isbn => "isbn",
    }
}

fn order_by(order: SortOrder, qualifier: &str) -> String {
    match order {
        SortOrder::NewestFirst => {
            format!("ORDER BY {qualifier}created_at DESC, {qualifier}id ASC")
        }
    }
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Built-in `LIKE` only folds ASCII, so both sides go through [`FOLD_FN`].
fn register_fold(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|text| text.to_lowercase()))
        },
    )
}

fn count(conn: &Connection, select: &str, clause: &WhereClause) -> rusqlite::Result<u64> {
    let sql = format!("{select}{}", clause.sql());
    let total: i64 = conn.query_row(&sql, params_from_iter(clause.values.iter()), |row| row.get(0))?;
    Ok(u64::try_from(total).unwrap_or_default())
}

fn select_author(conn: &Connection, id: AuthorId) -> rusqlite::Result<Option<Author>> {
    conn.query_row(
        &format!("SELECT {AUTHOR_COLUMNS} FROM authors WHERE id = ?1;"),
        [id.to_string()],
        |row| author_from_row(row, 0),
    )
    .optional()
}

fn select_book(conn: &Connection, id: BookId) -> rusqlite::Result<Option<Book>> {
    conn.query_row(
        &format!("{BOOK_SELECT_SQL} WHERE b.id = ?1;"),
        [id.to_string()],
        book_from_row,
    )
    .optional()
}

fn author_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Author> {
    Ok(Author {
        id: uuid_column(row, offset)?.into(),
        first_name: row.get(offset + 1)?,
        last_name: row.get(offset + 2)?,
        bio: row.get(offset + 3)?,
        birth_date: date_column(row, offset + 4)?,
        created_at: timestamp_column(row, offset + 5)?,
        updated_at: timestamp_column(row, offset + 6)?,
    })
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: uuid_column(row, 0)?.into(),
        title: row.get(1)?,
        isbn: row.get(2)?,
        published_date: date_column(row, 3)?,
        genre: row.get(4)?,
        author_id: uuid_column(row, 5)?.into(),
        created_at: timestamp_column(row, 6)?,
        updated_at: timestamp_column(row, 7)?,
        author: author_from_row(row, BOOK_AUTHOR_OFFSET)?,
    })
}

fn conversion_error(
    idx: usize,
    ty: Type,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|err| conversion_error(idx, Type::Text, err))
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<time::Date>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|text| {
        dates::parse(&text).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                Type::Text,
                format!("invalid calendar date `{text}`").into(),
            )
        })
    })
    .transpose()
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let micros: i64 = row.get(idx)?;
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
        .map_err(|err| conversion_error(idx, Type::Integer, err))
}

fn to_micros(timestamp: OffsetDateTime) -> i64 {
    i64::try_from(timestamp.unix_timestamp_nanos() / 1_000).unwrap_or(i64::MAX)
}

fn map_sqlite_error(err: rusqlite::Error) -> StoreError {
    let constraint = match &err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            Some((failure.extended_code, message.clone()))
        }
        _ => None,
    };

    match constraint {
        Some((ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY, message)) => {
            StoreError::UniqueViolation(message.unwrap_or_else(|| "unique constraint".to_string()))
        }
        Some((ffi::SQLITE_CONSTRAINT_FOREIGNKEY, _)) => StoreError::ForeignKeyViolation,
        _ => StoreError::Backend(anyhow::Error::new(err)),
    }
}
