//! Shelf application library
//!
//! Domain modules (`books`, `library`, `search`) and the bootstrap that wires
//! them onto the shared kernel, database and HTTP crates.

pub mod modules;
pub mod utils;

use anyhow::Context;
use axum::Router;
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use sqlx::SqlitePool;

pub use modules::Services;
use modules::search::providers::ExternalLookup;

/// A fully initialized application: migrated database, registered modules.
pub struct Application {
    settings: Settings,
    pool: SqlitePool,
    registry: ModuleRegistry,
    services: Services,
    migrations_applied: usize,
}

impl Application {
    /// Connect to the configured database and providers, then initialize.
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        let pool = shelf_db::connect(&settings.database).await?;
        let lookup = ExternalLookup::from_settings(&settings.providers)
            .context("failed to configure external providers")?;
        Self::with_parts(settings, pool, lookup).await
    }

    /// Initialize with an existing pool and provider set.
    pub async fn with_parts(
        settings: Settings,
        pool: SqlitePool,
        lookup: ExternalLookup,
    ) -> anyhow::Result<Self> {
        let mut registry = ModuleRegistry::new();
        let services = modules::register_all(&mut registry, &pool, &settings, lookup);

        let migrations = registry.collect_migrations();
        let migrations_applied = shelf_db::run_migrations(&pool, &migrations)
            .await
            .context("failed to run migrations")?;
        tracing::info!(
            applied = migrations_applied,
            known = migrations.len(),
            "migrations complete"
        );

        let ctx = InitCtx {
            settings: &settings,
            db: &pool,
        };
        registry.init_modules(&ctx).await?;

        Ok(Self {
            settings,
            pool,
            registry,
            services,
            migrations_applied,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Migrations applied by this bootstrap; zero when the schema was current.
    pub fn migrations_applied(&self) -> usize {
        self.migrations_applied
    }

    /// The complete HTTP router, as served by [`Application::run`].
    pub fn router(&self) -> Router {
        shelf_http::build_router(&self.registry, &self.settings)
    }

    /// Start modules and serve HTTP until Ctrl-C, then stop modules.
    pub async fn run(self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
            db: &self.pool,
        };
        self.registry.start_modules(&ctx).await?;

        shelf_http::start_server(&self.registry, &self.settings, shutdown_signal()).await?;

        self.registry.stop_modules().await?;
        self.pool.close().await;
        tracing::info!("shelf stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
