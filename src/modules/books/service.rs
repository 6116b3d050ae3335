//! Book operations over a [`BookStore`].
//!
//! Identifiers are format-checked before any store access, and existence is
//! read from the store's own result (no document returned, zero deleted)
//! rather than a separate probe.

use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use super::models::{is_valid_id, Book, BookPatch, NewBook};
use super::store::BookStore;

/// Outcome of a failed book operation.
#[derive(Debug, Error)]
pub enum BookError {
    #[error("invalid ID format: '{0}'")]
    InvalidIdentifier(String),

    #[error("book {0} not found")]
    NotFound(String),

    #[error("book {0} was inserted but could not be read back")]
    CreationVerificationFailed(String),

    /// Store failure, passed through untouched.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type BookResult<T> = Result<T, BookError>;

/// Stateless service; clones share the same store handle.
#[derive(Clone)]
pub struct BookService {
    store: Arc<dyn BookStore>,
}

impl BookService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    /// Insert `book`, then re-read it so the caller gets the stored representation.
    pub async fn create(&self, book: NewBook) -> BookResult<Book> {
        let id = self.store.insert_one(&book).await?;

        match self.store.find_one(id).await? {
            Some(created) => {
                tracing::info!(book_id = %id, title = %created.title, "book created");
                Ok(created)
            }
            None => {
                tracing::warn!(book_id = %id, "created book missing on read-back");
                Err(BookError::CreationVerificationFailed(id.to_hex()))
            }
        }
    }

    /// Every book in the collection, unpaginated.
    pub async fn list_all(&self) -> BookResult<Vec<Book>> {
        let books = self.store.find_all().await?;
        tracing::debug!(count = books.len(), "listed books");
        Ok(books)
    }

    pub async fn get_by_id(&self, id: &str) -> BookResult<Book> {
        let oid = parse_id(id)?;

        self.store
            .find_one(oid)
            .await?
            .ok_or_else(|| BookError::NotFound(id.to_string()))
    }

    /// Merge `patch` into the book; absent fields keep their values.
    pub async fn update(&self, id: &str, patch: BookPatch) -> BookResult<Book> {
        let oid = parse_id(id)?;

        match self.store.find_one_and_update(oid, &patch).await? {
            Some(updated) => {
                tracing::info!(book_id = %oid, "book updated");
                Ok(updated)
            }
            None => Err(BookError::NotFound(id.to_string())),
        }
    }

    pub async fn delete(&self, id: &str) -> BookResult<()> {
        let oid = parse_id(id)?;

        if self.store.delete_one(oid).await? == 0 {
            return Err(BookError::NotFound(id.to_string()));
        }

        tracing::info!(book_id = %oid, "book deleted");
        Ok(())
    }
}

fn parse_id(id: &str) -> BookResult<ObjectId> {
    if !is_valid_id(id) {
        tracing::debug!(id, "rejected malformed book id");
        return Err(BookError::InvalidIdentifier(id.to_string()));
    }
    ObjectId::parse_str(id).map_err(|_| BookError::InvalidIdentifier(id.to_string()))
}
