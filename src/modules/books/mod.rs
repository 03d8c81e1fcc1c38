pub mod models;
pub mod routes;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use catalog_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use crate::catalog::CatalogStore;
use service::BookService;

pub const MODULE_NAME: &str = "books";

/// Books, each owned by exactly one author and keyed uniquely by ISBN.
pub struct BooksModule {
    service: BookService,
}

impl BooksModule {
    pub fn new(service: BookService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &BookService {
        &self.service
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        MODULE_NAME
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi())
    }

    fn migrations(&self) -> Vec<Migration> {
        migrations()
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Requires the `authors` table; deleting a referenced author is refused.
pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_init",
        up: r#"
            CREATE TABLE IF NOT EXISTS books (
                id              TEXT PRIMARY KEY NOT NULL,
                title           TEXT NOT NULL CHECK (length(trim(title)) > 0),
                isbn            TEXT NOT NULL UNIQUE,
                published_date  TEXT,
                genre           TEXT,
                author_id       TEXT NOT NULL REFERENCES authors (id) ON DELETE RESTRICT,
                created_at      INTEGER NOT NULL,
                updated_at      INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS books_author_id_idx ON books (author_id);
            CREATE INDEX IF NOT EXISTS books_created_at_idx ON books (created_at DESC, id);
        "#,
    }]
}

pub fn create_module(store: Arc<dyn CatalogStore>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(BookService::new(store)))
}

fn openapi() -> serde_json::Value {
    let error = |description: &str| {
        json!({
            "description": description,
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
        })
    };
    let book = |status: &str| {
        json!({
            "description": status,
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Book" } } }
        })
    };
    let id_param = json!({
        "name": "id", "in": "path", "required": true,
        "schema": { "type": "string", "format": "uuid" }
    });

    json!({
        "paths": {
            "/": {
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/CreateBook" } } }
                    },
                    "responses": {
                        "201": book("Created"),
                        "409": error("ISBN already in use"),
                        "422": error("Validation error or unknown author")
                    }
                },
                "get": {
                    "summary": "List books, newest first",
                    "tags": ["Books"],
                    "parameters": [
                        { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1, "default": 1 } },
                        { "name": "limit", "in": "query", "schema": { "type": "integer", "minimum": 1, "maximum": 100, "default": 10 } },
                        { "name": "search", "in": "query", "schema": { "type": "string" } },
                        { "name": "authorId", "in": "query", "schema": { "type": "string", "format": "uuid" } }
                    ],
                    "responses": {
                        "200": {
                            "description": "One page of books",
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/BookPage" } } }
                        },
                        "422": error("Invalid page, limit or authorId")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book with its author",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "responses": { "200": book("OK"), "404": error("Book not found") }
                },
                "patch": {
                    "summary": "Update a book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/UpdateBook" } } }
                    },
                    "responses": {
                        "200": book("OK"),
                        "404": error("Book not found"),
                        "409": error("ISBN already in use"),
                        "422": error("Validation error or unknown author")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "204": { "description": "Deleted" },
                        "404": error("Book not found")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "title": { "type": "string", "maxLength": 500 },
                        "isbn": { "type": "string", "description": "Compact ISBN-10 or ISBN-13" },
                        "publishedDate": { "type": "string", "format": "date", "nullable": true },
                        "genre": { "type": "string", "maxLength": 100, "nullable": true },
                        "authorId": { "type": "string", "format": "uuid" },
                        "author": { "$ref": "#/components/schemas/Author" },
                        "createdAt": { "type": "string", "format": "date-time" },
                        "updatedAt": { "type": "string", "format": "date-time" }
                    },
                    "required": ["id", "title", "isbn", "authorId", "author", "createdAt", "updatedAt"]
                },
                "CreateBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "maxLength": 500 },
                        "isbn": { "type": "string" },
                        "authorId": { "type": "string", "format": "uuid" },
                        "publishedDate": { "type": "string", "format": "date" },
                        "genre": { "type": "string", "maxLength": 100 }
                    },
                    "required": ["title", "isbn", "authorId"]
                },
                "UpdateBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "maxLength": 500 },
                        "isbn": { "type": "string" },
                        "authorId": { "type": "string", "format": "uuid" },
                        "publishedDate": { "type": "string", "format": "date" },
                        "genre": { "type": "string", "maxLength": 100 }
                    }
                },
                "BookPage": {
                    "type": "object",
                    "properties": {
                        "data": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                        "total": { "type": "integer" },
                        "page": { "type": "integer" },
                        "limit": { "type": "integer" }
                    },
                    "required": ["data", "total", "page", "limit"]
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteCatalogStore;
    use crate::modules::authors::{models::CreateAuthor, service::AuthorService};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn setup() -> (BooksModule, String) {
        let store: Arc<dyn CatalogStore> = Arc::new(SqliteCatalogStore::open_in_memory().unwrap());
        let author = AuthorService::new(store.clone())
            .create(&CreateAuthor {
                first_name: "Liu".into(),
                last_name: "Cixin".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        (BooksModule::new(BookService::new(store)), author.id.to_string())
    }

    fn post(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn duplicate_isbn_is_409() {
        let (module, author_id) = setup().await;
        let body = json!({ "title": "The Three-Body Problem", "isbn": "9780306406157", "authorId": author_id });

        let first = module.routes().oneshot(post(body.clone())).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        let created = body_json(first).await;
        assert_eq!(created["author"]["lastName"], "Cixin");

        let second = module.routes().oneshot(post(body)).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(second).await["error"]["code"], "conflict");
    }

    #[tokio::test]
    async fn unknown_author_is_422_reference_not_found() {
        let (module, _) = setup().await;
        let body = json!({
            "title": "The Dark Forest",
            "isbn": "0306406152",
            "authorId": "0190f1c4-8b5e-7c3a-9a3e-2f1d5c6b7a80"
        });
        let response = module.routes().oneshot(post(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["error"]["code"], "reference_not_found");
    }

    #[tokio::test]
    async fn delete_returns_204_then_404() {
        let (module, author_id) = setup().await;
        let created = module
            .routes()
            .oneshot(post(json!({ "title": "Ball Lightning", "isbn": "0-306-40615-2", "authorId": author_id })))
            .await
            .unwrap();
        let id = body_json(created).await["id"].as_str().unwrap().to_string();

        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri(format!("/{id}"))
                .body(Body::empty())
                .unwrap()
        };
        let response = module.routes().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = module.routes().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_accepts_author_filter() {
        let (module, author_id) = setup().await;
        module
            .routes()
            .oneshot(post(json!({ "title": "Supernova Era", "isbn": "9780306406157", "authorId": author_id })))
            .await
            .unwrap();

        let uri = format!("/?authorId={author_id}&limit=5");
        let response = module
            .routes()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["limit"], 5);
        assert_eq!(body["data"][0]["isbn"], "9780306406157");
    }
}
