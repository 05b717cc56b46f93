use anyhow::Context;

use bookstack_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use bookstack_store::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookstack settings")?;
    bookstack_telemetry::init(&settings.telemetry);

    tracing::info!(
        env = ?settings.environment,
        page_size = settings.pagination.page_size,
        "bookstack-app bootstrap starting"
    );

    let store = MemoryStore::new();
    let mut registry = ModuleRegistry::new();
    bookstack_app::modules::register_all(&mut registry, &store, &settings);

    let ctx = InitCtx {
        settings: &settings,
        store: &store,
    };
    registry.init_modules(&ctx).await?;
    registry.apply_schemas(&ctx);
    registry.start_modules(&ctx).await?;

    bookstack_http::start_server(&registry, &settings).await?;

    registry.stop_modules().await?;

    tracing::info!("bookstack-app shutdown complete");
    Ok(())
}
