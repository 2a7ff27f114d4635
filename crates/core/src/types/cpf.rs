//! Brazilian individual taxpayer number (CPF).

use core::fmt;

use serde::{Deserialize, Serialize};

use super::digits_only;

/// Errors that can occur when parsing a [`Cpf`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CpfError {
    /// Not exactly 11 digits after removing punctuation.
    #[error("CPF must have 11 digits (got {0})")]
    Length(usize),
    /// All digits are the same (e.g. `111.111.111-11`).
    #[error("CPF cannot repeat a single digit")]
    Repeated,
    /// A check digit does not match.
    #[error("CPF check digits do not match")]
    Checksum,
}

/// A CPF that passed the check-digit validation.
///
/// Stored as 11 bare digits; [`Display`](fmt::Display) renders the
/// `XXX.XXX.XXX-XX` mask.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cpf(String);

impl Cpf {
    /// Number of digits in a CPF.
    pub const LEN: usize = 11;

    /// Parse a CPF, ignoring punctuation.
    ///
    /// # Errors
    ///
    /// Returns an error if the input does not have 11 digits, repeats one
    /// digit throughout, or fails either check digit.
    pub fn parse(input: &str) -> Result<Self, CpfError> {
        let digits: Vec<u32> = input.chars().filter_map(|c| c.to_digit(10)).collect();
        if digits.len() != Self::LEN {
            return Err(CpfError::Length(digits.len()));
        }
        if digits.windows(2).all(|w| w.first() == w.get(1)) {
            return Err(CpfError::Repeated);
        }
        if check_digit(&digits, 9) != digits.get(9).copied()
            || check_digit(&digits, 10) != digits.get(10).copied()
        {
            return Err(CpfError::Checksum);
        }
        Ok(Self(digits_only(input)))
    }

    /// The 11 bare digits.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// Apply the `XXX.XXX.XXX-XX` mask to partially typed input.
    ///
    /// Non-digits are dropped. Input longer than 11 digits is returned as
    /// bare digits.
    ///
    /// ```
    /// use grocer_core::Cpf;
    ///
    /// assert_eq!(Cpf::format_partial("5299"), "529.9");
    /// assert_eq!(Cpf::format_partial("52998224725"), "529.982.247-25");
    /// ```
    #[must_use]
    pub fn format_partial(input: &str) -> String {
        let digits = digits_only(input);
        if digits.len() > Self::LEN {
            return digits;
        }
        let mut out = String::with_capacity(14);
        for (i, c) in digits.chars().enumerate() {
            match i {
                3 | 6 => out.push('.'),
                9 => out.push('-'),
                _ => {}
            }
            out.push(c);
        }
        out
    }
}

/// Compute the check digit at `position` (9 or 10) from the digits before it.
fn check_digit(digits: &[u32], position: usize) -> Option<u32> {
    let weight_start = u32::try_from(position).ok()? + 1;
    let sum: u32 = digits
        .iter()
        .take(position)
        .zip((2..=weight_start).rev())
        .map(|(d, w)| d * w)
        .sum();
    let rest = (sum * 10) % 11;
    Some(if rest == 10 { 0 } else { rest })
}

impl fmt::Display for Cpf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Self::format_partial(&self.0))
    }
}

impl TryFrom<String> for Cpf {
    type Error = CpfError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cpf> for String {
    fn from(cpf: Cpf) -> Self {
        cpf.0
    }
}

impl std::str::FromStr for Cpf {
    type Err = CpfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
