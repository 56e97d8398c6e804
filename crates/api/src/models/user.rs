//! Accounts, roles and addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use emporium_core::{AddressId, Email, Permission, RoleId, UserId};

use crate::validation::{Validate, ValidationErrors};

/// Minimum password length in characters.
pub const MIN_PASSWORD_LEN: usize = 8;
/// Maximum password length in characters.
pub const MAX_PASSWORD_LEN: usize = 128;

/// A shop account together with its role.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: RoleSummary,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Display name, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.to_string()
        } else {
            name.to_string()
        }
    }

    /// Whether the user's role grants `permission`.
    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.is_admin && permission.is_granted_by(&self.role.permissions)
    }
}

/// The role fields carried with every loaded user.
#[derive(Debug, Clone, Serialize)]
pub struct RoleSummary {
    pub id: RoleId,
    pub code: String,
    pub is_admin: bool,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub code: String,
    pub permissions: Vec<Permission>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Code of the role given to self-registered users.
pub const CUSTOMER_ROLE: &str = "customer";
/// Code of the built-in role holding every permission.
pub const SUPER_ADMIN_ROLE: &str = "super_admin";

// =============================================================================
// Auth Inputs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl Validate for RegisterInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = Email::parse(&self.email) {
            errors.add("email", e.to_string());
        }
        check_password(&mut errors, "password", &self.password);
        errors.optional_text("first_name", Some(&self.first_name), 64);
        errors.optional_text("last_name", Some(&self.last_name), 64);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl Validate for LoginInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("email", &self.email, 254);
        if self.password.is_empty() {
            errors.add("password", "is required");
        }
        errors.into_result()
    }
}

/// Issued on login and registration.
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

// =============================================================================
// Profile Inputs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileInput {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

impl Validate for ProfileInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.optional_text("first_name", Some(&self.first_name), 64);
        errors.optional_text("last_name", Some(&self.last_name), 64);
        check_phone(&mut errors, self.phone.as_deref());
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

impl Validate for ChangePasswordInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.current_password.is_empty() {
            errors.add("current_password", "is required");
        }
        check_password(&mut errors, "new_password", &self.new_password);
        errors.into_result()
    }
}

fn check_password(errors: &mut ValidationErrors, field: &str, password: &str) {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        errors.add(field, format!("must be at least {MIN_PASSWORD_LEN} characters"));
    } else if len > MAX_PASSWORD_LEN {
        errors.add(field, format!("must be at most {MAX_PASSWORD_LEN} characters"));
    }
}

fn check_phone(errors: &mut ValidationErrors, phone: Option<&str>) {
    if let Some(phone) = phone
        && (phone.len() > 20
            || !phone
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-')))
    {
        errors.add("phone", "must be a phone number");
    }
}

// =============================================================================
// Admin Inputs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RoleInput {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub is_admin: bool,
}

impl RoleInput {
    /// Parsed permissions; call after [`Validate::validate`].
    #[must_use]
    pub fn parsed_permissions(&self) -> Vec<Permission> {
        self.permissions
            .iter()
            .filter_map(|p| p.parse().ok())
            .collect()
    }
}

impl Validate for RoleInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("name", &self.name, 64);
        if self.code.trim().is_empty()
            || !self
                .code
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            errors.add("code", "must be lowercase letters, digits and '_'");
        }
        for permission in &self.permissions {
            if permission.parse::<Permission>().is_err() {
                errors.add("permissions", format!("unknown permission '{permission}'"));
            }
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRoleInput {
    pub role_id: RoleId,
}

impl Validate for UserRoleInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserActiveInput {
    pub is_active: bool,
}

impl Validate for UserActiveInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

// =============================================================================
// Addresses
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub title: String,
    pub recipient: String,
    pub phone: String,
    pub province: String,
    pub city: String,
    pub street: String,
    pub postal_code: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressInput {
    pub title: String,
    pub recipient: String,
    pub phone: String,
    pub province: String,
    pub city: String,
    pub street: String,
    pub postal_code: String,
    #[serde(default)]
    pub is_default: bool,
}

impl Validate for AddressInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("title", &self.title, 64);
        errors.require_text("recipient", &self.recipient, 128);
        errors.require_text("phone", &self.phone, 20);
        check_phone(&mut errors, Some(&self.phone));
        errors.require_text("province", &self.province, 64);
        errors.require_text("city", &self.city, 64);
        errors.require_text("street", &self.street, 256);
        errors.require_text("postal_code", &self.postal_code, 16);
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_checks_email_and_password() {
        let input = RegisterInput {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            first_name: String::new(),
            last_name: String::new(),
        };
        let errors = input.validate().err().unwrap_or_default();
        assert_eq!(errors.field("email").len(), 1);
        assert_eq!(errors.field("password"), ["must be at least 8 characters"]);
    }

    #[test]
    fn test_role_input_rejects_unknown_permissions() {
        let input = RoleInput {
            name: "Catalog".to_string(),
            code: "catalog_editor".to_string(),
            permissions: vec!["manage_catalog".to_string(), "fly".to_string()],
            is_admin: true,
        };
        let errors = input.validate().err().unwrap_or_default();
        assert_eq!(errors.field("permissions"), ["unknown permission 'fly'"]);
    }

    #[test]
    fn test_role_input_parses_permissions() {
        let input = RoleInput {
            name: "Orders".to_string(),
            code: "orders".to_string(),
            permissions: vec!["manage_orders".to_string()],
            is_admin: true,
        };
        assert!(input.validate().is_ok());
        assert_eq!(input.parsed_permissions(), vec![Permission::ManageOrders]);
    }

    #[test]
    fn test_phone_format() {
        let mut errors = ValidationErrors::new();
        check_phone(&mut errors, Some("+1 555-0100"));
        assert!(errors.is_empty());
        check_phone(&mut errors, Some("call me"));
        assert_eq!(errors.field("phone").len(), 1);
    }

    #[test]
    fn test_permission_requires_admin_role() {
        let user = User {
            id: UserId::new(1),
            email: Email::parse("a@shop.test").unwrap_or_else(|_| unreachable!()),
            first_name: String::new(),
            last_name: String::new(),
            phone: None,
            role: RoleSummary {
                id: RoleId::new(2),
                code: "customer".to_string(),
                is_admin: false,
                permissions: vec![Permission::All],
            },
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!user.has_permission(Permission::ManageCatalog));
        assert_eq!(user.display_name(), "a@shop.test");
    }
}
