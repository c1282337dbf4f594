use crate::core::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Connection pools for the operational and analytics stores
#[derive(Clone)]
pub struct DatabasePools {
    pub ops: PgPool,
    pub analytics: PgPool,
}

impl DatabasePools {
    /// Apply the embedded migrations of each store.
    ///
    /// Both sets may land in the same database, so each ignores versions owned by the other.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        let mut ops = sqlx::migrate!("./migrations/ops");
        ops.set_ignore_missing(true);
        ops.run(&self.ops).await?;

        let mut analytics = sqlx::migrate!("./migrations/analytics");
        analytics.set_ignore_missing(true);
        analytics.run(&self.analytics).await?;
        Ok(())
    }
}

pub async fn create_pool(url: &str, config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .connect(url)
        .await
}

/// Hide credentials when logging a connection URL
pub fn redact_url(url: &str) -> &str {
    url.split('@').next_back().unwrap_or("***")
}
