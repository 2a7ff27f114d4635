//! Grocer client library.
//!
//! Client-side state for the Grocer storefront: the cart, favorites and
//! theme stores, the session that composes them, and the contracts they
//! depend on.
//!
//! # Architecture
//!
//! - The remote API is the source of truth for carts and favorites. Stores
//!   cache what the UI renders and never compute business values locally.
//! - Device-local state (bearer token, favorites mirror, dark-mode flag)
//!   lives behind the [`storage::KeyValueStore`] contract.
//! - Every store publishes its slice through a `tokio::sync::watch`
//!   channel; screens subscribe and re-render on change.
//! - Stores are constructed explicitly around injected `Arc`s of the API and
//!   storage, so tests substitute in-memory fakes.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use grocer_client::{config::ClientConfig, api::HttpApi, storage::FileStore, Session};
//!
//! let config = ClientConfig::from_env()?;
//! let api = Arc::new(HttpApi::new(&config)?);
//! let storage = Arc::new(FileStore::open(&config.state_dir));
//! let session = Session::new(api, storage);
//!
//! session.bootstrap().await;
//! session.login("maria@example.com", &password).await?;
//! let now_favorite = session.toggle_favorite(&product_id).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod profile;
pub mod search;
pub mod session;
pub mod storage;
pub mod stores;

pub use error::{ProfileError, SessionError, StoreError};
pub use profile::ProfileDraft;
pub use search::{SearchController, SearchState};
pub use session::{Bootstrap, Session};
pub use stores::{CartStore, FavoritesState, FavoritesStore, Refresh, ThemeStore};
