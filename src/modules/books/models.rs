use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::catalog::{
    dates, query::SearchField, query::Searchable, validation::Validator, CatalogResult,
};
use crate::modules::authors::models::{Author, AuthorId};

pub const TITLE_MAX_CHARS: usize = 500;
pub const GENRE_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(Uuid);

impl BookId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl From<Uuid> for BookId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for BookId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Stored book with its owning author resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    /// Canonical compact form, no separators.
    pub isbn: String,
    #[serde(serialize_with = "dates::optional::serialize")]
    pub published_date: Option<Date>,
    pub genre: Option<String>,
    pub author_id: AuthorId,
    pub author: Author,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Searchable for Book {
    const SEARCH_FIELDS: &'static [SearchField] = &[SearchField::Title, SearchField::Isbn];
}

/// Row written by the store on create; the author is joined on read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    pub id: BookId,
    pub title: String,
    pub isbn: String,
    pub published_date: Option<Date>,
    pub genre: Option<String>,
    pub author_id: AuthorId,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub author_id: String,
    pub published_date: Option<String>,
    pub genre: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub isbn: String,
    pub author_id: AuthorId,
    pub published_date: Option<Date>,
    pub genre: Option<String>,
}

impl CreateBook {
    pub fn validate(&self) -> CatalogResult<NewBook> {
        let mut v = Validator::new();
        let title = v.required_text("title", &self.title, TITLE_MAX_CHARS);
        let isbn = v.isbn("isbn", &self.isbn);
        let author_id = v.identifier("authorId", &self.author_id);
        let published_date = v.optional_date("publishedDate", self.published_date.as_deref());
        let genre = v.optional_text("genre", self.genre.as_deref(), GENRE_MAX_CHARS);

        v.finish(|| {
            Some(NewBook {
                title: title?,
                isbn: isbn?,
                author_id: author_id?,
                published_date,
                genre,
            })
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    pub title: Option<String>,
    pub isbn: Option<String>,
    pub author_id: Option<String>,
    pub published_date: Option<String>,
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub isbn: Option<String>,
    pub author_id: Option<AuthorId>,
    pub published_date: Option<Date>,
    pub genre: Option<String>,
}

impl UpdateBook {
    pub fn validate(&self) -> CatalogResult<BookPatch> {
        let mut v = Validator::new();
        let patch = BookPatch {
            title: v.replacement_text("title", self.title.as_deref(), TITLE_MAX_CHARS),
            isbn: self.isbn.as_deref().and_then(|isbn| v.isbn("isbn", isbn)),
            author_id: self
                .author_id
                .as_deref()
                .and_then(|id| v.identifier("authorId", id)),
            published_date: v.optional_date("publishedDate", self.published_date.as_deref()),
            genre: v.optional_text("genre", self.genre.as_deref(), GENRE_MAX_CHARS),
        };
        v.finish(|| Some(patch))
    }
}

/// Equality filters ANDed with the search clause when listing books.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub author_id: Option<AuthorId>,
}
