//! Emporium Core - Shared domain types.
//!
//! This crate provides the types used across all Emporium components:
//! - `api` - The REST backend (`/api/v1/user/*` and `/api/v1/admin/*`)
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Pricing and pagination arithmetic lives here so it can be
//! tested without a server.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, money math, pagination, statuses and permissions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
