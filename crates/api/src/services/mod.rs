//! Business logic services.
//!
//! # Services
//!
//! - `auth` - registration, login, password reset, profile
//! - `codes` - one-time verification codes with expiry
//! - `delivery` - getting codes to users
//! - `orders` - order aggregate validation and lifecycle
//! - `tokens` - JWT access/refresh tokens

pub mod auth;
pub mod codes;
pub mod delivery;
pub mod orders;
pub mod tokens;
