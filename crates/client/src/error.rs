//! Error types for store mutations and session flows.
//!
//! Refresh operations (`fetch_cart_info`, `fetch_favorites`, `load_theme`)
//! never return these; they log and report a [`Refresh`](crate::Refresh)
//! outcome instead. Write-through mutations surface failures here so the
//! caller can retry rather than let memory and disk diverge.

use grocer_core::{CpfError, EmailError, PasswordError, PhoneError};
use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Failure of a store mutation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The durable write failed; in-memory state was left unchanged.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Validation failure for a profile edit.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    /// A name field was left blank.
    #[error("{0} cannot be empty")]
    EmptyName(&'static str),

    /// A name field holds something other than letters and spaces.
    #[error("{0} may only contain letters and spaces")]
    NameCharacters(&'static str),

    /// A name field is longer than the storefront accepts.
    #[error("{0} cannot exceed {1} characters")]
    NameTooLong(&'static str, usize),

    /// CPF did not validate.
    #[error("Invalid CPF: {0}")]
    Cpf(#[from] CpfError),

    /// Phone did not validate.
    #[error("Invalid phone: {0}")]
    Phone(#[from] PhoneError),

    /// Nothing changed, so no request is sent.
    #[error("No changes to save")]
    NoChanges,
}

/// Failure of a session-level flow.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No bearer token is stored.
    #[error("Not signed in")]
    NotSignedIn,

    /// The login email is malformed.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Registration needs a name.
    #[error("Full name cannot be empty")]
    MissingName,

    /// The new password breaks the password policy.
    #[error("Invalid password: {0}")]
    InvalidPassword(#[from] PasswordError),

    /// Quantities start at one.
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    /// The profile edit did not validate.
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// The remote API call failed; local state was not changed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Reading or writing device-local state failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A store mutation failed after the server accepted the change.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SessionError {
    /// Whether the user has to sign in (again) to continue.
    #[must_use]
    pub const fn needs_login(&self) -> bool {
        matches!(self, Self::NotSignedIn | Self::Api(ApiError::Unauthorized))
    }
}
