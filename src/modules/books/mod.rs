pub mod models;
pub mod repository;
pub mod routes;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{routing::get, Router};
use serde_json::json;

use bookstack_kernel::{InitCtx, Module};
use bookstack_store::{MemoryStore, TableSchema};

use repository::{BookRepository, StoreBookRepository, BOOKS_SCHEMA};

/// Books module: the catalog CRUD surface.
pub struct BooksModule {
    repository: Arc<dyn BookRepository>,
}

impl BooksModule {
    pub fn new(store: MemoryStore, page_size: usize) -> Self {
        Self {
            repository: Arc::new(StoreBookRepository::new(store, page_size)),
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            page_size = ctx.settings.pagination.page_size,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(routes::list_books).post(routes::create_book))
            .route(
                "/{id}",
                get(routes::get_book)
                    .put(routes::update_book)
                    .patch(routes::update_book)
                    .delete(routes::delete_book),
            )
            .route("/health", get(health_check))
            .with_state(self.repository.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "description": "Retrieve a paginated list of all books, ordered by title.",
                        "tags": ["Books"],
                        "parameters": [
                            {
                                "name": "page",
                                "in": "query",
                                "required": false,
                                "schema": {"type": "integer", "minimum": 1}
                            }
                        ],
                        "responses": {
                            "200": {
                                "description": "One page of books",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/BookPage"}
                                    }
                                }
                            },
                            "404": {
                                "description": "Invalid page",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/BookDraft"}
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Created book",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/Book"}
                                    }
                                }
                            },
                            "400": {
                                "description": "Field validation failure or duplicate ISBN",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Retrieve a book",
                        "tags": ["Books"],
                        "parameters": [
                            {
                                "name": "id",
                                "in": "path",
                                "required": true,
                                "schema": {"type": "integer"}
                            }
                        ],
                        "responses": {
                            "200": {
                                "description": "The book",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/Book"}
                                    }
                                }
                            },
                            "404": {
                                "description": "Book not found",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    },
                    "put": {
                        "summary": "Update a book",
                        "description": "Partial or full update; unsupplied fields keep their current values.",
                        "tags": ["Books"],
                        "parameters": [
                            {
                                "name": "id",
                                "in": "path",
                                "required": true,
                                "schema": {"type": "integer"}
                            }
                        ],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/BookPatch"}
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Updated book",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/Book"}
                                    }
                                }
                            },
                            "400": {
                                "description": "Field validation failure or duplicate ISBN",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            },
                            "404": {
                                "description": "Book not found",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": [
                            {
                                "name": "id",
                                "in": "path",
                                "required": true,
                                "schema": {"type": "integer"}
                            }
                        ],
                        "responses": {
                            "204": {
                                "description": "Deleted"
                            },
                            "404": {
                                "description": "Book not found",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": {
                                "type": "integer",
                                "description": "Store-assigned identifier"
                            },
                            "title": {
                                "type": "string"
                            },
                            "author": {
                                "type": "string"
                            },
                            "publication_date": {
                                "type": "string",
                                "format": "date"
                            },
                            "isbn": {
                                "type": "string",
                                "description": "10 or 13 decimal digits, globally unique"
                            },
                            "summary": {
                                "type": "string",
                                "nullable": true
                            }
                        },
                        "required": ["id", "title", "author", "publication_date", "isbn"]
                    },
                    "BookDraft": {
                        "type": "object",
                        "properties": {
                            "title": {"type": "string"},
                            "author": {"type": "string"},
                            "publication_date": {"type": "string", "format": "date"},
                            "isbn": {"type": "string"},
                            "summary": {"type": "string", "nullable": true}
                        },
                        "required": ["title", "author", "publication_date", "isbn"]
                    },
                    "BookPatch": {
                        "type": "object",
                        "properties": {
                            "title": {"type": "string"},
                            "author": {"type": "string"},
                            "publication_date": {"type": "string", "format": "date"},
                            "isbn": {"type": "string"},
                            "summary": {"type": "string"}
                        }
                    },
                    "BookPage": {
                        "type": "object",
                        "properties": {
                            "count": {"type": "integer"},
                            "next": {"type": "string", "nullable": true},
                            "previous": {"type": "string", "nullable": true},
                            "results": {
                                "type": "array",
                                "items": {"$ref": "#/components/schemas/Book"}
                            }
                        },
                        "required": ["count", "results"]
                    }
                }
            }
        }))
    }

    fn schemas(&self) -> Vec<TableSchema> {
        vec![BOOKS_SCHEMA]
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

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

/// Create a new instance of the books module
pub fn create_module(store: MemoryStore, page_size: usize) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store, page_size))
}
