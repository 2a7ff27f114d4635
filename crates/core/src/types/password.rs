//! Password policy for new accounts.
//!
//! The storefront accepts passwords of at least eight characters drawn from
//! ASCII letters, digits and `@$!%*#?&`, with at least one of each class.
//! Only new passwords are checked; login sends whatever the user typed.

/// Characters allowed besides ASCII letters and digits.
pub const PASSWORD_SYMBOLS: &str = "@$!%*#?&";

/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Ways a new password can violate the policy.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must have at least {MIN_PASSWORD_LEN} characters")]
    TooShort,
    #[error("password must contain a letter")]
    MissingLetter,
    #[error("password must contain a digit")]
    MissingDigit,
    #[error("password must contain one of {PASSWORD_SYMBOLS}")]
    MissingSymbol,
    #[error("password contains unsupported character '{0}'")]
    InvalidCharacter(char),
}

/// Check a new password against the policy.
///
/// ```
/// use grocer_core::{PasswordError, validate_new_password};
///
/// assert!(validate_new_password("feira#2024").is_ok());
/// assert_eq!(validate_new_password("feira2024"), Err(PasswordError::MissingSymbol));
/// ```
///
/// # Errors
///
/// Returns the first rule the password breaks, checking characters before
/// length and the character classes last.
pub fn validate_new_password(password: &str) -> Result<(), PasswordError> {
    if let Some(c) = password
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !PASSWORD_SYMBOLS.contains(*c))
    {
        return Err(PasswordError::InvalidCharacter(c));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(PasswordError::TooShort);
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(PasswordError::MissingLetter);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordError::MissingDigit);
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        return Err(PasswordError::MissingSymbol);
    }
    Ok(())
}
