//! Schema setup.
//!
//! Applies the SQL migrations under `crates/api/migrations`, then adds any
//! settings columns declared in code but missing from the table, and makes
//! sure the built-in roles exist.

use emporium_api::db::{self, RoleRepository, SettingsRepository};

use super::{CliError, connect};

/// # Errors
///
/// Returns `CliError` if the connection, a migration or the settings sync fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    db::run_migrations(&pool).await?;

    let added = SettingsRepository::new(&pool).sync_schema().await?;
    if added.is_empty() {
        tracing::info!("Settings table is up to date");
    } else {
        tracing::info!(columns = ?added, "Added settings columns");
    }

    let created = RoleRepository::new(&pool).ensure_builtin().await?;
    tracing::info!(created, "Built-in roles checked");

    tracing::info!("Migrations complete!");
    Ok(())
}
