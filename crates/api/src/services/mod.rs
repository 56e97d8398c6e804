//! Business logic that spans more than one repository.
//!
//! # Services
//!
//! - `auth` - Registration, login, password changes and access tokens
//! - `orders` - Cart pricing, checkout and the order status lifecycle
//! - `uploads` - Image upload validation and on-disk storage

pub mod auth;
pub mod orders;
pub mod uploads;
