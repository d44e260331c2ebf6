//! Sundry Core - Shared domain types.
//!
//! This crate provides the types and rules shared by every Sundry component:
//! - `api` - The HTTP backend (accounts, catalog, orders)
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. With the `postgres` feature enabled the types gain `sqlx`
//! encode/decode support so repositories can bind them directly.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails and verification purposes
//! - [`validation`] - Credential rules shared by registration and password reset

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::{validate_email_shape, validate_password_strength};
