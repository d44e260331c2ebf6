//! Verification purposes.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a [`VerificationPurpose`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid verification purpose: {0}")]
pub struct ParsePurposeError(pub String);

/// What a verification code was issued for.
///
/// A code issued for one purpose can never be consumed for the other; the
/// purpose is part of the code store key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationPurpose {
    /// Creating a new account.
    Registration,
    /// Replacing the password of an existing account.
    #[default]
    PasswordReset,
}

impl VerificationPurpose {
    /// Stable identifier, used on the wire and in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for VerificationPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationPurpose {
    type Err = ParsePurposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registration" => Ok(Self::Registration),
            "password_reset" => Ok(Self::PasswordReset),
            _ => Err(ParsePurposeError(s.to_owned())),
        }
    }
}
