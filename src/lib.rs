//! Catalog application library
//!
//! Authors and books with ISBN validation, paginated search and referential
//! integrity, mounted as modules on the shared HTTP stack.

pub mod catalog;
pub mod modules;
pub mod utils;

use std::sync::Arc;

use anyhow::Context;
use catalog_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use catalog::{CatalogStore, SqliteCatalogStore};

/// Open the store and register every module against it.
pub fn bootstrap(settings: &Settings) -> anyhow::Result<ModuleRegistry> {
    let store: Arc<dyn CatalogStore> = Arc::new(SqliteCatalogStore::open(&settings.database)?);

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, store);
    Ok(registry)
}

/// Run the HTTP service until shutdown, then stop modules in reverse order.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.path,
        "catalog bootstrap starting"
    );

    let registry = bootstrap(&settings)?;
    registry
        .init_all(&InitCtx {
            settings: &settings,
        })
        .await
        .context("module initialization failed")?;

    let served = catalog_http::start_server(&registry, &settings).await;
    registry.stop_all().await?;
    served
}

/// Apply pending schema migrations without starting the service.
pub fn migrate(settings: &Settings) -> anyhow::Result<()> {
    if settings.database.is_in_memory() {
        anyhow::bail!("refusing to migrate an in-memory database; set database.path");
    }
    SqliteCatalogStore::open(&settings.database)?;
    tracing::info!(db = %settings.database.path, "schema is up to date");
    Ok(())
}
