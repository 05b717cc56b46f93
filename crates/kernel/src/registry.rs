use anyhow::Context;
use std::sync::Arc;

use bookstack_store::TableSchema;

use crate::module::{InitCtx, Module};

/// Module registry for managing module lifecycle.
///
/// Modules are initialized and started in registration order and stopped in
/// reverse order.
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Register a module with the registry
    pub fn register(&mut self, module: Arc<dyn Module>) {
        self.modules.push(module);
    }

    /// Get all registered modules
    pub fn modules(&self) -> &[Arc<dyn Module>] {
        &self.modules
    }

    /// Get a module by name
    pub fn get_module(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.iter().find(|module| module.name() == name)
    }

    /// Initialize modules in registration order
    pub async fn init_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("initializing {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "initializing module");

            module
                .init(ctx)
                .await
                .with_context(|| format!("failed to initialize module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Apply every module's table schemas to the store
    pub fn apply_schemas(&self, ctx: &InitCtx<'_>) {
        for (module_name, schema) in self.collect_schemas() {
            tracing::info!(module = %module_name, table = schema.name, "applying schema");
            ctx.store.define_table(schema);
        }
    }

    /// Start modules in registration order
    pub async fn start_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("starting {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "starting module");

            module
                .start(ctx)
                .await
                .with_context(|| format!("failed to start module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Stop modules in reverse registration order
    pub async fn stop_modules(&self) -> anyhow::Result<()> {
        tracing::info!("stopping {} modules", self.modules.len());

        for module in self.modules.iter().rev() {
            tracing::info!(module = module.name(), "stopping module");

            module
                .stop()
                .await
                .with_context(|| format!("failed to stop module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Collect all table schemas from all modules, tagged with the owning
    /// module's name for deterministic ordering.
    pub fn collect_schemas(&self) -> Vec<(String, TableSchema)> {
        let mut schemas = Vec::new();

        for module in &self.modules {
            for schema in module.schemas() {
                schemas.push((module.name().to_string(), schema));
            }
        }

        schemas.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.name.cmp(b.1.name)));

        schemas
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use bookstack_store::MemoryStore;

    struct TestModule {
        name: &'static str,
    }

    #[async_trait::async_trait]
    impl Module for TestModule {
        fn name(&self) -> &'static str {
            self.name
        }

        fn schemas(&self) -> Vec<TableSchema> {
            vec![TableSchema {
                name: "test",
                unique: &["code"],
                indexed: &[],
            }]
        }
    }

    #[test]
    fn test_module_registry_creation() {
        let registry = ModuleRegistry::new();
        assert!(registry.modules().is_empty());
    }

    #[test]
    fn test_schema_collection() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule { name: "test" }));
        let schemas = registry.collect_schemas();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].1.name, "test");
    }

    #[tokio::test]
    async fn test_module_lifecycle() {
        let mut registry = ModuleRegistry::new();
        let settings = Settings::default();
        let store = MemoryStore::new();
        let ctx = InitCtx {
            settings: &settings,
            store: &store,
        };

        registry.register(Arc::new(TestModule { name: "test" }));

        registry.init_modules(&ctx).await.unwrap();
        registry.apply_schemas(&ctx);
        registry.start_modules(&ctx).await.unwrap();
        registry.stop_modules().await.unwrap();

        // Schema application is observable through the store.
        assert_eq!(store.count("test").unwrap(), 0);
    }
}
