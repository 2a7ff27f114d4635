//! Brazilian phone numbers (landline and mobile).

use core::fmt;

use serde::{Deserialize, Serialize};

use super::digits_only;

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// Neither a 10-digit landline nor an 11-digit mobile number.
    #[error("phone must have 10 or 11 digits (got {0})")]
    Length(usize),
    /// An 11-digit number whose subscriber part does not start with 9.
    #[error("mobile numbers must start with 9 after the area code")]
    MobilePrefix,
}

/// A phone number with area code (DDD), stored as bare digits.
///
/// Landlines have 10 digits; mobiles have 11 with a leading `9` after the
/// two-digit area code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    /// Parse a phone number, ignoring punctuation.
    ///
    /// # Errors
    ///
    /// Returns an error if the input has neither 10 nor 11 digits, or if an
    /// 11-digit number lacks the mobile `9` prefix.
    pub fn parse(input: &str) -> Result<Self, PhoneError> {
        let digits = digits_only(input);
        match digits.len() {
            10 => Ok(Self(digits)),
            11 if digits.as_bytes().get(2) == Some(&b'9') => Ok(Self(digits)),
            11 => Err(PhoneError::MobilePrefix),
            n => Err(PhoneError::Length(n)),
        }
    }

    /// The bare digits including area code.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// Whether this is an 11-digit mobile number.
    #[must_use]
    pub fn is_mobile(&self) -> bool {
        self.0.len() == 11
    }

    /// Apply the phone mask to partially typed input.
    ///
    /// Up to 10 digits are shown as `(DD) XXXX-XXXX` once enough digits are
    /// present; exactly 11 digits become `(DD) X XXXX-XXXX`. Longer input
    /// is returned as bare digits.
    ///
    /// ```
    /// use grocer_core::Phone;
    ///
    /// assert_eq!(Phone::format_partial("119"), "(11) 9");
    /// assert_eq!(Phone::format_partial("1123456789"), "(11) 2345-6789");
    /// assert_eq!(Phone::format_partial("11987654321"), "(11) 9 8765-4321");
    /// ```
    #[must_use]
    #[allow(clippy::indexing_slicing)] // ASCII digits, bounds fixed by the length match
    pub fn format_partial(input: &str) -> String {
        let digits = digits_only(input);
        let len = digits.len();
        match len {
            0..=2 | 12.. => digits,
            3..=9 => format!("({}) {}", &digits[..2], &digits[2..]),
            10 => format!("({}) {}-{}", &digits[..2], &digits[2..6], &digits[6..]),
            _ => format!(
                "({}) {} {}-{}",
                &digits[..2],
                &digits[2..3],
                &digits[3..7],
                &digits[7..]
            ),
        }
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Self::format_partial(&self.0))
    }
}

impl TryFrom<String> for Phone {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}
