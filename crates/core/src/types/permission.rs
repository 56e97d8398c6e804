//! Permissions granted to roles.
//!
//! Roles store their permissions as a `text[]` of the snake_case names below.

use serde::{Deserialize, Serialize};

/// A permission an admin role can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Grants every other permission.
    All,
    /// Brands, categories, colors, features, products, items and pictures.
    ManageCatalog,
    /// Order listing and status changes.
    ManageOrders,
    ManageDiscounts,
    /// Comment moderation and replies.
    ManageComments,
    ManageUsers,
    ManageRoles,
    /// Uploads and app pictures.
    ManageFiles,
    ManageSettings,
}

impl Permission {
    /// Every permission, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::All,
        Self::ManageCatalog,
        Self::ManageOrders,
        Self::ManageDiscounts,
        Self::ManageComments,
        Self::ManageUsers,
        Self::ManageRoles,
        Self::ManageFiles,
        Self::ManageSettings,
    ];

    /// The name stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::ManageCatalog => "manage_catalog",
            Self::ManageOrders => "manage_orders",
            Self::ManageDiscounts => "manage_discounts",
            Self::ManageComments => "manage_comments",
            Self::ManageUsers => "manage_users",
            Self::ManageRoles => "manage_roles",
            Self::ManageFiles => "manage_files",
            Self::ManageSettings => "manage_settings",
        }
    }

    /// Whether a list of granted permission names covers `self`.
    ///
    /// Unknown names in `granted` are ignored.
    #[must_use]
    pub fn is_granted_by<S: AsRef<str>>(self, granted: &[S]) -> bool {
        granted.iter().any(|name| {
            let name = name.as_ref();
            name == Self::All.as_str() || name == self.as_str()
        })
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Permission {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("invalid permission: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_names() {
        for p in Permission::ALL {
            assert_eq!(p.as_str().parse::<Permission>(), Ok(p));
        }
        assert!("manage_everything".parse::<Permission>().is_err());
    }

    #[test]
    fn test_all_grants_everything() {
        let granted = ["all"];
        assert!(Permission::ManageSettings.is_granted_by(&granted));
        assert!(Permission::ManageCatalog.is_granted_by(&granted));
    }

    #[test]
    fn test_specific_grant() {
        let granted = vec!["manage_orders".to_string()];
        assert!(Permission::ManageOrders.is_granted_by(&granted));
        assert!(!Permission::ManageUsers.is_granted_by(&granted));
        assert!(!Permission::All.is_granted_by(&granted));
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&Permission::ManageDiscounts).unwrap_or_default();
        assert_eq!(json, "\"manage_discounts\"");
    }
}
