use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use catalog_http::error::AppError;
use serde::Deserialize;

use super::models::{Book, BookFilter, BookId, CreateBook, UpdateBook};
use super::service::BookService;
use crate::catalog::{CatalogError, Page, PageParams};
use crate::modules::authors::models::AuthorId;
use crate::modules::http::path_id;

/// Query string of `GET /api/books`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookListParams {
    page: Option<i64>,
    limit: Option<i64>,
    search: Option<String>,
    author_id: Option<String>,
}

impl BookListParams {
    fn split(self) -> Result<(PageParams, BookFilter), CatalogError> {
        let author_id = self
            .author_id
            .map(|raw| {
                raw.trim()
                    .parse::<AuthorId>()
                    .map_err(|_| CatalogError::invalid("authorId", "must be a UUID"))
            })
            .transpose()?;

        let page = PageParams {
            page: self.page,
            limit: self.limit,
            search: self.search,
        };
        Ok((page, BookFilter { author_id }))
    }
}

pub fn router(service: BookService) -> Router {
    Router::new()
        .route("/", post(create_book).get(list_books))
        .route("/{id}", get(get_book).patch(update_book).delete(delete_book))
        .with_state(service)
}

async fn create_book(
    State(service): State<BookService>,
    input: Result<Json<CreateBook>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(input) = input?;
    let book = service.create(&input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn list_books(
    State(service): State<BookService>,
    params: Result<Query<BookListParams>, QueryRejection>,
) -> Result<Json<Page<Book>>, AppError> {
    let Query(params) = params?;
    let (page, filter) = params.split()?;
    Ok(Json(service.list(&page, filter).await?))
}

async fn get_book(
    State(service): State<BookService>,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    let id: BookId = path_id("book", &id)?;
    Ok(Json(service.get(id).await?))
}

async fn update_book(
    State(service): State<BookService>,
    Path(id): Path<String>,
    input: Result<Json<UpdateBook>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Json(input) = input?;
    let id: BookId = path_id("book", &id)?;
    Ok(Json(service.update(id, &input).await?))
}

async fn delete_book(
    State(service): State<BookService>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id: BookId = path_id("book", &id)?;
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
