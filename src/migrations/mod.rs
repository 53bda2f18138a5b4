// Migration orchestrator for the TaskFlow notifier
// Embedded in the application binary for distroless container compatibility

pub mod diesel;

use crate::app_config::AppConfig;
use std::error::Error;
use tracing::{error, info};

/// Run all pending PostgreSQL migrations
pub async fn run_all_migrations(database_url: &str) -> Result<usize, Box<dyn Error + Send + Sync>> {
    info!("[MIGRATIONS] Running Diesel (PostgreSQL) migrations...");
    match diesel::run_migrations(database_url.to_string()).await {
        Ok(applied_count) => {
            if applied_count > 0 {
                info!("[MIGRATIONS] ✓ Applied {} Diesel migrations", applied_count);
            } else {
                info!("[MIGRATIONS] ✓ Diesel migrations up to date");
            }
            Ok(applied_count)
        },
        Err(e) => {
            error!("[MIGRATIONS] ✗ Diesel migration failed: {}", e);
            Err(format!("Diesel migration failed: {}", e).into())
        },
    }
}

/// Check if migrations should run based on configuration
pub fn should_run_migrations(config: &AppConfig) -> bool {
    !config.disable_embedded_migrations
}
