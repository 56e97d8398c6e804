//! Domain models for the shop.
//!
//! Read models are serialized straight into responses. `*Input` types are
//! request bodies; each implements [`Validate`](crate::validation::Validate)
//! and is extracted with [`ValidJson`](crate::validation::ValidJson).

pub mod catalog;
pub mod content;
pub mod order;
pub mod settings;
pub mod user;
