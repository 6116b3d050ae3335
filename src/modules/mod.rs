pub mod books;

use shelf_kernel::ModuleRegistry;

use crate::storage::Storage;

/// Register every service module with the registry
pub fn register_all(registry: &mut ModuleRegistry, storage: &Storage) {
    registry.register(books::create_module(storage.book_store()));
}
