pub mod models;
pub mod routes;
pub mod service;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use shelf_kernel::{InitCtx, Migration, Module};

use service::BookService;
use store::BookStore;

/// Books module: CRUD over the `books` collection
pub struct BooksModule {
    service: BookService,
}

impl BooksModule {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self {
            service: BookService::new(store),
        }
    }
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        }
    })
}

fn book_fields() -> serde_json::Value {
    json!({
        "title": { "type": "string", "description": "Title of the book" },
        "author": { "type": "string", "description": "Author of the book" },
        "price": { "type": "number", "format": "double", "description": "Price of the book" },
        "isbn": { "type": "string", "description": "ISBN of the book" },
        "language": { "type": "string", "description": "Language the book is written in" },
        "numberOfPage": { "type": "integer", "format": "int32", "description": "Page count" },
        "publisher": { "type": "string", "description": "Publisher of the book" }
    })
}

const BOOK_FIELDS: [&str; 7] = [
    "title",
    "author",
    "price",
    "isbn",
    "language",
    "numberOfPage",
    "publisher",
];

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = ?ctx.settings.database.backend,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let id_parameter = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "description": "24-character hexadecimal book identifier",
            "schema": { "type": "string", "pattern": "^[0-9a-fA-F]{24}$" }
        });

        let mut book_properties = book_fields();
        book_properties["_id"] = json!({
            "type": "string",
            "description": "Store-assigned identifier"
        });
        let mut book_required: Vec<&str> = vec!["_id"];
        book_required.extend(BOOK_FIELDS);

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Every book in the collection",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            },
                            "500": error_response("Internal server error")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/CreateBook" }
                                }
                            }
                        },
                        "responses": {
                            "201": book_response("Created book"),
                            "400": error_response("Malformed body or store failure")
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book by id",
                        "tags": ["Books"],
                        "parameters": [id_parameter.clone()],
                        "responses": {
                            "200": book_response("The book"),
                            "400": error_response("Invalid ID format"),
                            "404": error_response("Book not found")
                        }
                    },
                    "put": {
                        "summary": "Update a book by id",
                        "tags": ["Books"],
                        "parameters": [id_parameter.clone()],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/UpdateBook" }
                                }
                            }
                        },
                        "responses": {
                            "200": book_response("Updated book"),
                            "400": error_response("Invalid ID format or malformed body"),
                            "404": error_response("Book not found")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book by id",
                        "tags": ["Books"],
                        "parameters": [id_parameter],
                        "responses": {
                            "204": { "description": "Book deleted" },
                            "400": error_response("Invalid ID format"),
                            "404": error_response("Book not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": book_properties,
                        "required": book_required
                    },
                    "CreateBook": {
                        "type": "object",
                        "properties": book_fields(),
                        "required": BOOK_FIELDS
                    },
                    "UpdateBook": {
                        "type": "object",
                        "description": "Only the supplied fields are changed",
                        "properties": book_fields()
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_isbn_index",
            up: r#"{
                "createIndexes": "books",
                "indexes": [{ "key": { "isbn": 1 }, "name": "books_isbn" }]
            }"#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(store: Arc<dyn BookStore>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store))
}
