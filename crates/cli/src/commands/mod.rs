//! Command implementations.
//!
//! Every command runs against a [`Session`] composed from environment
//! configuration: the HTTP API client and the file-backed state directory.
//!
//! # Environment Variables
//!
//! - `GROCER_API_BASE_URL` - Storefront API base URL (required)
//! - `GROCER_STATE_DIR` - Directory holding the session state file
//! - `GROCER_SEARCH_DEBOUNCE_MS` - Quiet period before `search` sends its query

pub mod auth;
pub mod cart;
pub mod favorites;
pub mod profile;
pub mod search;
pub mod theme;

use std::sync::Arc;

use grocer_client::api::{ApiError, HttpApi};
use grocer_client::config::{ClientConfig, ConfigError};
use grocer_client::storage::FileStore;
use grocer_client::{Session, SessionError, StoreError};
use thiserror::Error;

/// The session type every command works with.
pub type AppSession = Session<HttpApi, FileStore>;

/// A bootstrapped session and the configuration it was built from.
pub struct App {
    /// Session with device state loaded and, when signed in, refreshed.
    pub session: AppSession,
    /// Configuration read from the environment.
    pub config: ClientConfig,
}

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error("API client error: {0}")]
    Api(#[from] ApiError),

    /// A session flow failed.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// A local store write failed.
    #[error("{0}")]
    Store(#[from] StoreError),
}

/// Build a session from the environment and load device state.
///
/// # Errors
///
/// Returns an error if configuration is missing or the HTTP client cannot
/// be built.
pub async fn connect() -> Result<App, CommandError> {
    let config = ClientConfig::from_env()?;
    let api = Arc::new(HttpApi::new(&config)?);
    let storage = Arc::new(FileStore::open(&config.state_dir));
    tracing::debug!(
        api = %config.api_base_url,
        state = %storage.path().display(),
        "Session configured"
    );

    let session = Session::new(api, storage);
    session.bootstrap().await;
    Ok(App { session, config })
}
