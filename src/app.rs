//! Application bootstrap shared by the server binary and the CLI.

use anyhow::Context;
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::{modules, storage::Storage};

/// Registry with every module wired to `storage`.
pub fn build_registry(storage: &Storage) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, storage);
    registry
}

/// Connect, migrate, serve until shutdown, then stop modules.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let storage = Storage::connect(&settings.database)
        .await
        .context("failed to open storage")?;

    let registry = build_registry(&storage);
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_all(&ctx).await?;
    storage
        .migrate(&registry)
        .await
        .context("failed to apply migrations")?;
    registry.start_all(&ctx).await?;

    tracing::info!("bootstrap complete");

    let served = shelf_http::start_server(&registry, &settings).await;
    registry.stop_all().await?;
    served
}
