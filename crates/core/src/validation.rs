//! Credential rules shared by registration and password reset.
//!
//! Both functions are pure predicates. Callers turn a `false` into the
//! appropriate domain error.

use unicode_properties::{GeneralCategory, UnicodeGeneralCategory};

/// Minimum password length, counted in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Returns `true` if `s` looks like an email address.
///
/// The rule is deliberately weak: `s` must contain an `@` and the text after
/// the *last* `@` must contain a `.`. Nothing else is checked, so
/// `"@example.com"` passes while `"user@localhost"` does not.
///
/// ```
/// use sundry_core::validate_email_shape;
///
/// assert!(validate_email_shape("user@example.com"));
/// assert!(!validate_email_shape("user@localhost"));
/// assert!(!validate_email_shape("no-at-symbol.com"));
/// ```
#[must_use]
pub fn validate_email_shape(s: &str) -> bool {
    s.rsplit_once('@')
        .is_some_and(|(_, domain)| domain.contains('.'))
}

/// Returns `true` if `s` is strong enough to be used as a password.
///
/// A strong password has at least [`MIN_PASSWORD_LENGTH`] characters, at
/// least one alphabetic character and at least one decimal digit (Unicode
/// category `Nd`). Classification follows Unicode, so `"пароль12"` is as good
/// as `"password12"`, while `"abcdefg½"` has no digit.
///
/// ```
/// use sundry_core::validate_password_strength;
///
/// assert!(validate_password_strength("abcdefg1"));
/// assert!(!validate_password_strength("abcdefgh"));
/// ```
#[must_use]
pub fn validate_password_strength(s: &str) -> bool {
    s.chars().count() >= MIN_PASSWORD_LENGTH
        && s.chars().any(char::is_alphabetic)
        && s.chars().any(is_decimal_digit)
}

fn is_decimal_digit(c: char) -> bool {
    c.general_category() == GeneralCategory::DecimalNumber
}
