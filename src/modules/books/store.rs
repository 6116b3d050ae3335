//! Persistence for book documents.

use std::{collections::BTreeMap, sync::Arc};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::ReturnDocument,
    Collection, Database,
};
use tokio::sync::RwLock;

use super::models::{Book, BookDocument, BookPatch, NewBook, COLLECTION};

/// Single-document primitives the book service is built on.
///
/// Every method is one store round-trip and atomic for the document it touches.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Insert a document and return the identifier the store assigned.
    async fn insert_one(&self, book: &NewBook) -> anyhow::Result<ObjectId>;

    async fn find_one(&self, id: ObjectId) -> anyhow::Result<Option<Book>>;

    async fn find_all(&self) -> anyhow::Result<Vec<Book>>;

    /// Merge `patch` into the matching document and return it as updated.
    async fn find_one_and_update(
        &self,
        id: ObjectId,
        patch: &BookPatch,
    ) -> anyhow::Result<Option<Book>>;

    /// Delete at most one document; returns how many were removed.
    async fn delete_one(&self, id: ObjectId) -> anyhow::Result<u64>;
}

/// MongoDB-backed store over the `books` collection.
#[derive(Clone)]
pub struct MongoBookStore {
    collection: Collection<BookDocument>,
}

impl MongoBookStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(COLLECTION),
        }
    }
}

#[async_trait]
impl BookStore for MongoBookStore {
    async fn insert_one(&self, book: &NewBook) -> anyhow::Result<ObjectId> {
        let result = self
            .collection
            .clone_with_type::<NewBook>()
            .insert_one(book)
            .await
            .context("insert into books failed")?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow!("store assigned a non-ObjectId identifier: {}", result.inserted_id))
    }

    async fn find_one(&self, id: ObjectId) -> anyhow::Result<Option<Book>> {
        let found = self
            .collection
            .find_one(doc! { "_id": id })
            .await
            .with_context(|| format!("lookup of book {} failed", id))?;
        Ok(found.map(Book::from))
    }

    async fn find_all(&self) -> anyhow::Result<Vec<Book>> {
        let mut cursor = self
            .collection
            .find(doc! {})
            .await
            .context("listing books failed")?;

        let mut books = Vec::new();
        while cursor.advance().await.context("reading books cursor failed")? {
            let document = cursor
                .deserialize_current()
                .context("malformed book document")?;
            books.push(Book::from(document));
        }
        Ok(books)
    }

    async fn find_one_and_update(
        &self,
        id: ObjectId,
        patch: &BookPatch,
    ) -> anyhow::Result<Option<Book>> {
        // MongoDB rejects an empty `$set`; nothing to write means a plain read.
        if patch.is_empty() {
            return self.find_one(id).await;
        }

        let changes = mongodb::bson::to_document(patch).context("unable to encode book patch")?;
        let updated = self
            .collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": changes })
            .return_document(ReturnDocument::After)
            .await
            .with_context(|| format!("update of book {} failed", id))?;
        Ok(updated.map(Book::from))
    }

    async fn delete_one(&self, id: ObjectId) -> anyhow::Result<u64> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id })
            .await
            .with_context(|| format!("delete of book {} failed", id))?;
        Ok(result.deleted_count)
    }
}

/// In-process store for local runs and tests.
#[derive(Clone, Default)]
pub struct MemoryBookStore {
    documents: Arc<RwLock<BTreeMap<ObjectId, NewBook>>>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

fn to_book(id: ObjectId, fields: &NewBook) -> Book {
    Book::from(BookDocument::new(id, fields.clone()))
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn insert_one(&self, book: &NewBook) -> anyhow::Result<ObjectId> {
        let id = ObjectId::new();
        self.documents.write().await.insert(id, book.clone());
        Ok(id)
    }

    async fn find_one(&self, id: ObjectId) -> anyhow::Result<Option<Book>> {
        Ok(self
            .documents
            .read()
            .await
            .get(&id)
            .map(|fields| to_book(id, fields)))
    }

    async fn find_all(&self) -> anyhow::Result<Vec<Book>> {
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .map(|(id, fields)| to_book(*id, fields))
            .collect())
    }

    async fn find_one_and_update(
        &self,
        id: ObjectId,
        patch: &BookPatch,
    ) -> anyhow::Result<Option<Book>> {
        let mut documents = self.documents.write().await;
        Ok(documents.get_mut(&id).map(|fields| {
            patch.apply_to(fields);
            to_book(id, fields)
        }))
    }

    async fn delete_one(&self, id: ObjectId) -> anyhow::Result<u64> {
        Ok(self.documents.write().await.remove(&id).map_or(0, |_| 1))
    }
}
