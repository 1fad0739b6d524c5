// Embedded schema migrations, applied at startup
// Shipped inside the binary so a fresh database can be bootstrapped without the diesel CLI

pub mod diesel;

use crate::app_config::AppConfig;
use std::error::Error;
use tracing::{error, info};

/// Apply pending migrations against the configured database
pub async fn run_all_migrations(config: &AppConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!(
        "[MIGRATIONS] Starting migration process for environment: {}",
        config.environment
    );

    match diesel::run_migrations(config.database.url.clone()).await {
        Ok(0) => info!("[MIGRATIONS] Schema up to date"),
        Ok(applied) => info!("[MIGRATIONS] Applied {} migrations", applied),
        Err(e) => {
            error!("[MIGRATIONS] Migration failed: {}", e);
            return Err(format!("Diesel migration failed: {}", e).into());
        },
    }

    Ok(())
}

/// Migrations run unless DISABLE_EMBEDDED_MIGRATIONS is set
pub fn should_run_migrations(config: &AppConfig) -> bool {
    !config.database.disable_embedded_migrations
}
