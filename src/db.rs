//! Database connection pool, migrations and store selection.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::services::memory::MemoryStore;
use crate::services::package::{PackageRepository, PgPackageRepository};
use crate::services::user::{PgUserRepository, UserRepository};

/// Creates a PostgreSQL connection pool with configured settings.
///
/// # Configuration
/// - Maximum connections: 5
/// - Acquire timeout: 3 seconds
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await
}

/// Runs all pending database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// User and package repositories sharing one backend.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub packages: Arc<dyn PackageRepository>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            packages: Arc::new(PgPackageRepository::new(pool)),
        }
    }

    pub fn memory(store: MemoryStore) -> Self {
        Self {
            users: Arc::new(store.clone()),
            packages: Arc::new(store),
        }
    }
}

/// Connects, migrates and returns Postgres-backed stores when `DATABASE_URL`
/// is set, otherwise an empty in-memory store.
pub async fn connect_stores(config: &Config) -> Result<Stores, sqlx::Error> {
    match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            tracing::info!("Database connection pool created");

            run_migrations(&pool).await?;
            tracing::info!("Database migrations completed");

            Ok(Stores::postgres(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; using the in-memory store, data will not persist");
            Ok(Stores::memory(MemoryStore::new()))
        }
    }
}
