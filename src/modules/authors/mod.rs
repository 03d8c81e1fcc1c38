pub mod models;
pub mod routes;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use catalog_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use crate::catalog::CatalogStore;
use service::AuthorService;

pub const MODULE_NAME: &str = "authors";

/// Authors: the parent side of the author/book relation.
pub struct AuthorsModule {
    service: AuthorService,
}

impl AuthorsModule {
    pub fn new(service: AuthorService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &AuthorService {
        &self.service
    }
}

#[async_trait]
impl Module for AuthorsModule {
    fn name(&self) -> &'static str {
        MODULE_NAME
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "authors module initialized"
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
        tracing::info!(module = self.name(), "authors module stopped");
        Ok(())
    }
}

/// Schema owned by this module, in execution order.
pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_init",
        up: r#"
            CREATE TABLE IF NOT EXISTS authors (
                id          TEXT PRIMARY KEY NOT NULL,
                first_name  TEXT NOT NULL CHECK (length(trim(first_name)) > 0),
                last_name   TEXT NOT NULL CHECK (length(trim(last_name)) > 0),
                bio         TEXT,
                birth_date  TEXT,
                created_at  INTEGER NOT NULL,
                updated_at  INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS authors_created_at_idx ON authors (created_at DESC, id);
        "#,
    }]
}

pub fn create_module(store: Arc<dyn CatalogStore>) -> Arc<dyn Module> {
    Arc::new(AuthorsModule::new(AuthorService::new(store)))
}

fn openapi() -> serde_json::Value {
    let error = |description: &str| {
        json!({
            "description": description,
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
        })
    };
    let author = |status: &str| {
        json!({
            "description": status,
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Author" } } }
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
                    "summary": "Create an author",
                    "tags": ["Authors"],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/CreateAuthor" } } }
                    },
                    "responses": {
                        "201": author("Created"),
                        "422": error("Validation error")
                    }
                },
                "get": {
                    "summary": "List authors, newest first",
                    "tags": ["Authors"],
                    "parameters": [
                        { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1, "default": 1 } },
                        { "name": "limit", "in": "query", "schema": { "type": "integer", "minimum": 1, "maximum": 100, "default": 10 } },
                        { "name": "search", "in": "query", "schema": { "type": "string" } }
                    ],
                    "responses": {
                        "200": {
                            "description": "One page of authors",
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/AuthorPage" } } }
                        },
                        "422": error("Invalid page or limit")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get an author",
                    "tags": ["Authors"],
                    "parameters": [id_param.clone()],
                    "responses": { "200": author("OK"), "404": error("Author not found") }
                },
                "patch": {
                    "summary": "Update an author",
                    "tags": ["Authors"],
                    "parameters": [id_param.clone()],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/UpdateAuthor" } } }
                    },
                    "responses": {
                        "200": author("OK"),
                        "404": error("Author not found"),
                        "422": error("Validation error")
                    }
                },
                "delete": {
                    "summary": "Delete an author without books",
                    "tags": ["Authors"],
                    "parameters": [id_param],
                    "responses": {
                        "204": { "description": "Deleted" },
                        "404": error("Author not found"),
                        "409": error("Author still has books")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Author": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "firstName": { "type": "string", "maxLength": 100 },
                        "lastName": { "type": "string", "maxLength": 100 },
                        "bio": { "type": "string", "maxLength": 1000, "nullable": true },
                        "birthDate": { "type": "string", "format": "date", "nullable": true },
                        "createdAt": { "type": "string", "format": "date-time" },
                        "updatedAt": { "type": "string", "format": "date-time" }
                    },
                    "required": ["id", "firstName", "lastName", "createdAt", "updatedAt"]
                },
                "CreateAuthor": {
                    "type": "object",
                    "properties": {
                        "firstName": { "type": "string", "maxLength": 100 },
                        "lastName": { "type": "string", "maxLength": 100 },
                        "bio": { "type": "string", "maxLength": 1000 },
                        "birthDate": { "type": "string", "format": "date" }
                    },
                    "required": ["firstName", "lastName"]
                },
                "UpdateAuthor": {
                    "type": "object",
                    "properties": {
                        "firstName": { "type": "string", "maxLength": 100 },
                        "lastName": { "type": "string", "maxLength": 100 },
                        "bio": { "type": "string", "maxLength": 1000 },
                        "birthDate": { "type": "string", "format": "date" }
                    }
                },
                "AuthorPage": {
                    "type": "object",
                    "properties": {
                        "data": { "type": "array", "items": { "$ref": "#/components/schemas/Author" } },
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
