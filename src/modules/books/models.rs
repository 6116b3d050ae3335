use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Collection holding book documents.
pub const COLLECTION: &str = "books";

/// Length of a hex-encoded store identifier.
pub const ID_LEN: usize = 24;

/// A stored book as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Store-assigned identifier, 24 hex characters
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub author: String,
    pub price: f64,
    pub isbn: String,
    pub language: String,
    pub number_of_page: i32,
    pub publisher: String,
}

/// Request model for creating a new book. The identifier is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub price: f64,
    pub isbn: String,
    pub language: String,
    pub number_of_page: i32,
    pub publisher: String,
}

/// Partial update: only the fields that are present are written.
///
/// Unknown keys, `_id` included, are ignored so the identifier never changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_page: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay the present fields onto `book`.
    pub fn apply_to(&self, book: &mut NewBook) {
        if let Some(title) = &self.title {
            book.title = title.clone();
        }
        if let Some(author) = &self.author {
            book.author = author.clone();
        }
        if let Some(price) = self.price {
            book.price = price;
        }
        if let Some(isbn) = &self.isbn {
            book.isbn = isbn.clone();
        }
        if let Some(language) = &self.language {
            book.language = language.clone();
        }
        if let Some(number_of_page) = self.number_of_page {
            book.number_of_page = number_of_page;
        }
        if let Some(publisher) = &self.publisher {
            book.publisher = publisher.clone();
        }
    }
}

/// Persisted shape of a book.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub author: String,
    pub price: f64,
    pub isbn: String,
    pub language: String,
    pub number_of_page: i32,
    pub publisher: String,
}

impl BookDocument {
    pub fn new(id: ObjectId, fields: NewBook) -> Self {
        Self {
            id,
            title: fields.title,
            author: fields.author,
            price: fields.price,
            isbn: fields.isbn,
            language: fields.language,
            number_of_page: fields.number_of_page,
            publisher: fields.publisher,
        }
    }
}

impl From<BookDocument> for Book {
    fn from(doc: BookDocument) -> Self {
        Self {
            id: doc.id.to_hex(),
            title: doc.title,
            author: doc.author,
            price: doc.price,
            isbn: doc.isbn,
            language: doc.language,
            number_of_page: doc.number_of_page,
            publisher: doc.publisher,
        }
    }
}

/// True iff `id` has the store's identifier shape: exactly 24 hex digits.
pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_hexdigit())
}
