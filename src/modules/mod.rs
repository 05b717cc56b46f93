pub mod books;

use bookstack_kernel::{settings::Settings, ModuleRegistry};
use bookstack_store::MemoryStore;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, store: &MemoryStore, settings: &Settings) {
    registry.register(books::create_module(
        store.clone(),
        settings.pagination.page_size,
    ));
}
