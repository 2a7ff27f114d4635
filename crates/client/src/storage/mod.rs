//! Device-local key-value persistence.
//!
//! The stores persist three keys: the bearer token, the favorites mirror
//! and the dark-mode flag. Values are strings; structured values are JSON.
//! Keys are partitioned per store, so the only ordering rule is that the
//! last write to a key wins.

mod file;
mod memory;

use std::future::Future;

use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Bearer token issued at login.
pub const TOKEN_KEY: &str = "userToken";
/// JSON presence map of favorited product IDs.
pub const FAVORITES_KEY: &str = "favorites";
/// JSON boolean dark-mode flag.
pub const DARK_MODE_KEY: &str = "darkMode";

/// Errors from the key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded or decoded as JSON.
    #[error("storage JSON error in {key}: {source}")]
    Json {
        /// Key being read or written.
        key: String,
        /// Underlying serde error.
        source: serde_json::Error,
    },

    /// The backend refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Asynchronous string key-value store.
///
/// Reads of a missing key return `Ok(None)`; removing a missing key is not
/// an error. All methods take `&self`, so implementations use interior
/// mutability.
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a value by key.
    fn get_item(&self, key: &str)
    -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Insert or replace a value.
    fn set_item(&self, key: &str, value: &str)
    -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Remove a value.
    fn remove_item(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Read and decode a JSON value.
///
/// # Errors
///
/// Returns an error if the store fails or the stored value is not valid JSON
/// for `T`.
pub async fn read_json<S, T>(store: &S, key: &str) -> Result<Option<T>, StorageError>
where
    S: KeyValueStore,
    T: DeserializeOwned,
{
    let Some(raw) = store.get_item(key).await? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StorageError::Json {
            key: key.to_owned(),
            source,
        })
}

/// Encode and write a JSON value.
///
/// # Errors
///
/// Returns an error if encoding fails or the store rejects the write.
pub async fn write_json<S, T>(store: &S, key: &str, value: &T) -> Result<(), StorageError>
where
    S: KeyValueStore,
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Json {
        key: key.to_owned(),
        source,
    })?;
    store.set_item(key, &raw).await
}

/// Read the bearer token, treating an empty value as absent.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn read_token<S>(store: &S) -> Result<Option<SecretString>, StorageError>
where
    S: KeyValueStore,
{
    Ok(store
        .get_item(TOKEN_KEY)
        .await?
        .filter(|token| !token.trim().is_empty())
        .map(SecretString::from))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[tokio::test]
    async fn test_json_helpers_round_trip_bool() {
        let store = MemoryStore::new();
        write_json(&store, DARK_MODE_KEY, &true).await.unwrap();
        assert_eq!(
            store.get_item(DARK_MODE_KEY).await.unwrap().as_deref(),
            Some("true")
        );
        let value: Option<bool> = read_json(&store, DARK_MODE_KEY).await.unwrap();
        assert_eq!(value, Some(true));
    }

    #[tokio::test]
    async fn test_read_json_missing_key() {
        let store = MemoryStore::new();
        let value: Option<bool> = read_json(&store, DARK_MODE_KEY).await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_read_json_reports_key_on_garbage() {
        let store = MemoryStore::new();
        store.set_item(DARK_MODE_KEY, "yes please").await.unwrap();
        let err = read_json::<_, bool>(&store, DARK_MODE_KEY)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Json { ref key, .. } if key == DARK_MODE_KEY));
    }

    #[tokio::test]
    async fn test_read_token_ignores_blank() {
        let store = MemoryStore::new();
        assert!(read_token(&store).await.unwrap().is_none());

        store.set_item(TOKEN_KEY, "  ").await.unwrap();
        assert!(read_token(&store).await.unwrap().is_none());

        store.set_item(TOKEN_KEY, "abc.def").await.unwrap();
        let token = read_token(&store).await.unwrap().unwrap();
        assert_eq!(token.expose_secret(), "abc.def");
    }
}
