//! Reference data.

use emporium_api::db::RoleRepository;

use super::{CliError, connect};

/// Create the built-in roles that are missing.
///
/// # Errors
///
/// Returns `CliError` if the connection or an insert fails.
pub async fn roles() -> Result<(), CliError> {
    let pool = connect().await?;
    let created = RoleRepository::new(&pool).ensure_builtin().await?;
    tracing::info!(created, "Built-in roles seeded");
    Ok(())
}
