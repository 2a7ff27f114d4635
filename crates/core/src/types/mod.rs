//! Core types for Grocer.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod cpf;
pub mod email;
pub mod id;
pub mod password;
pub mod phone;
pub mod price;

pub use cart::CartAggregate;
pub use cpf::{Cpf, CpfError};
pub use email::{Email, EmailError};
pub use id::*;
pub use password::{MIN_PASSWORD_LEN, PASSWORD_SYMBOLS, PasswordError, validate_new_password};
pub use phone::{Phone, PhoneError};
pub use price::{CurrencyCode, Price};

/// Strip everything but ASCII digits from user input.
#[must_use]
pub fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}
