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

use super::models::{Author, AuthorId, CreateAuthor, UpdateAuthor};
use super::service::AuthorService;
use crate::catalog::{Page, PageParams};
use crate::modules::http::path_id;

pub fn router(service: AuthorService) -> Router {
    Router::new()
        .route("/", post(create_author).get(list_authors))
        .route(
            "/{id}",
            get(get_author).patch(update_author).delete(delete_author),
        )
        .with_state(service)
}

async fn create_author(
    State(service): State<AuthorService>,
    input: Result<Json<CreateAuthor>, JsonRejection>,
) -> Result<(StatusCode, Json<Author>), AppError> {
    let Json(input) = input?;
    let author = service.create(&input).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

async fn list_authors(
    State(service): State<AuthorService>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Page<Author>>, AppError> {
    let Query(params) = params?;
    Ok(Json(service.list(&params).await?))
}

async fn get_author(
    State(service): State<AuthorService>,
    Path(id): Path<String>,
) -> Result<Json<Author>, AppError> {
    let id: AuthorId = path_id("author", &id)?;
    Ok(Json(service.get(id).await?))
}

async fn update_author(
    State(service): State<AuthorService>,
    Path(id): Path<String>,
    input: Result<Json<UpdateAuthor>, JsonRejection>,
) -> Result<Json<Author>, AppError> {
    let Json(input) = input?;
    let id: AuthorId = path_id("author", &id)?;
    Ok(Json(service.update(id, &input).await?))
}

async fn delete_author(
    State(service): State<AuthorService>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id: AuthorId = path_id("author", &id)?;
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
