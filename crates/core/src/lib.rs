//! Grocer Core - Shared domain types.
//!
//! This crate provides the types used across all Grocer components:
//! - `client` - State stores, persistence and the remote API client
//! - `cli` - Command-line front end for a storefront session
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no async runtime. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product IDs, prices, cart aggregates and the validated
//!   profile fields (email, CPF, phone) and the new-password policy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
