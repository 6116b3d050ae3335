//! Book catalogue service.
//!
//! The `books` module exposes create/list/get/update/delete over a document
//! collection; the surrounding crates provide settings, HTTP and storage.

pub mod app;
pub mod modules;
pub mod storage;

pub use app::{build_registry, run};
pub use storage::Storage;
