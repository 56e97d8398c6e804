//! Core types for Emporium.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod pagination;
pub mod permission;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{DiscountKind, discount_amount, round_money};
pub use pagination::Pagination;
pub use permission::Permission;
pub use status::*;
