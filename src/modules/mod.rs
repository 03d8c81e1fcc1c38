pub mod authors;
pub mod books;
pub mod http;

use std::sync::Arc;

use catalog_kernel::{Migration, ModuleRegistry};

use crate::catalog::CatalogStore;

/// Register the catalog modules, parents before children.
pub fn register_all(registry: &mut ModuleRegistry, store: Arc<dyn CatalogStore>) {
    registry.register(authors::create_module(store.clone()));
    registry.register(books::create_module(store));
}

/// Every module's migrations tagged with the owning module name.
///
/// Available before any module is constructed, so the store can be opened
/// first. Ordered so `authors` runs before the `books` table that references it.
pub fn schema_migrations() -> Vec<(String, Migration)> {
    [
        (authors::MODULE_NAME, authors::migrations()),
        (books::MODULE_NAME, books::migrations()),
    ]
    .into_iter()
    .flat_map(|(module, migrations)| {
        migrations
            .into_iter()
            .map(move |migration| (module.to_string(), migration))
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteCatalogStore;

    #[test]
    fn registry_and_schema_agree_on_migrations() {
        let store = Arc::new(SqliteCatalogStore::open_in_memory().unwrap());
        let mut registry = ModuleRegistry::new();
        register_all(&mut registry, store);

        let from_registry: Vec<(String, &str)> = registry
            .collect_migrations()
            .into_iter()
            .map(|(module, m)| (module, m.id))
            .collect();
        let from_schema: Vec<(String, &str)> = schema_migrations()
            .into_iter()
            .map(|(module, m)| (module, m.id))
            .collect();
        assert_eq!(from_registry, from_schema);
        assert_eq!(registry.len(), 2);
    }
}
