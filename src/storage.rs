//! Persistence handles, acquired once at startup and shared by every request.

use std::sync::Arc;

use mongodb::Database;
use shelf_kernel::{
    settings::{DatabaseBackend, DatabaseSettings},
    ModuleRegistry,
};

use crate::modules::books::store::{BookStore, MemoryBookStore, MongoBookStore};

#[derive(Clone)]
pub enum Storage {
    Mongo(Database),
    Memory(MemoryBookStore),
}

impl Storage {
    /// Open the configured backend.
    pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        match settings.backend {
            DatabaseBackend::Mongo => {
                let db = shelf_db::connect(settings).await?;
                shelf_db::ping(&db).await?;
                Ok(Self::Mongo(db))
            }
            DatabaseBackend::Memory => {
                tracing::warn!("using in-memory storage; data is lost on exit");
                Ok(Self::memory())
            }
        }
    }

    pub fn memory() -> Self {
        Self::Memory(MemoryBookStore::new())
    }

    pub fn book_store(&self) -> Arc<dyn BookStore> {
        match self {
            Self::Mongo(db) => Arc::new(MongoBookStore::new(db)),
            Self::Memory(store) => Arc::new(store.clone()),
        }
    }

    /// Apply module migrations; the memory backend has nothing to migrate.
    pub async fn migrate(&self, registry: &ModuleRegistry) -> anyhow::Result<()> {
        match self {
            Self::Mongo(db) => shelf_db::apply_migrations(db, &registry.collect_migrations()).await,
            Self::Memory(_) => {
                tracing::debug!("skipping migrations for in-memory storage");
                Ok(())
            }
        }
    }
}
