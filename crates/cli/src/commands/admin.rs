//! Admin account management.
//!
//! The API has no way to create the first admin, so it is done here.

use emporium_api::db::{RepositoryError, RoleRepository, UserRepository};
use emporium_api::services::auth::{hash_password, validate_password};
use emporium_core::Email;

use super::{CliError, connect};

/// Create a user holding `role`, which must be an admin role.
///
/// # Errors
///
/// Returns `CliError` if the email or password is invalid, the role is not
/// an admin role, or the email is already registered.
pub async fn create_user(
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
    role: &str,
) -> Result<(), CliError> {
    let email = Email::parse(email)?;
    validate_password(password)?;

    let pool = connect().await?;

    let role_record = RoleRepository::new(&pool)
        .get_by_code(role)
        .await?
        .ok_or_else(|| CliError::UnknownRole(role.to_owned()))?;
    if !role_record.is_admin {
        return Err(CliError::NotAdminRole(role.to_owned()));
    }

    let password_hash = hash_password(password)?;
    let user = UserRepository::new(&pool)
        .create(&email, &password_hash, first_name, last_name, role, None)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => CliError::UserExists(email.to_string()),
            other => CliError::Repository(other),
        })?;

    tracing::info!("Admin user created successfully!");
    tracing::info!("  ID: {}", user.id);
    tracing::info!("  Email: {}", user.email);
    tracing::info!("  Role: {}", user.role.code);

    Ok(())
}

/// Replace the password of the user with `email`.
///
/// # Errors
///
/// Returns `CliError` if the password is too weak or no user has that email.
pub async fn set_password(email: &str, password: &str) -> Result<(), CliError> {
    let email = Email::parse(email)?;
    validate_password(password)?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    let (user, _) = users
        .get_credentials(&email)
        .await?
        .ok_or_else(|| CliError::UnknownUser(email.to_string()))?;

    let password_hash = hash_password(password)?;
    users.set_password(user.id, &password_hash, None).await?;

    tracing::info!(user_id = %user.id, "Password updated");
    Ok(())
}
