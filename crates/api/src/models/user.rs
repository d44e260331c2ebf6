//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sundry_core::{Email, UserId};

/// Maximum display name length, in characters.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 150;

/// A shop account (domain type).
///
/// The password hash is deliberately not part of this type; it is only read
/// through `UserStore::get_password_hash`.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Email address, exactly as registered.
    pub email: Email,
    /// Name shown to the user, initially the local part of their email.
    pub display_name: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Public view of this user.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            display_name: self.display_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// What `/user/info` returns.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub display_name: String,
    pub email: Email,
}

/// Derive the initial display name from an email's local part.
#[must_use]
pub fn display_name_for(email: &Email) -> String {
    email
        .local_part()
        .chars()
        .take(MAX_DISPLAY_NAME_LENGTH)
        .collect()
}
