//! Dark-mode flag store.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, error, instrument};

use crate::error::StoreError;
use crate::storage::{DARK_MODE_KEY, KeyValueStore, read_json, write_json};

/// UI theme flag, written through to device storage.
///
/// Defaults to light mode. The flag survives logout.
pub struct ThemeStore<S> {
    storage: Arc<S>,
    tx: watch::Sender<bool>,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> ThemeStore<S> {
    /// Create a store in light mode.
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            tx: watch::channel(false).0,
            write_lock: Mutex::new(()),
        }
    }

    /// Whether dark mode is on.
    pub fn dark_mode(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver notified when the flag changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Load the persisted flag; call once at startup before rendering.
    ///
    /// A missing or unreadable value keeps the current flag. Returns the
    /// flag in effect afterwards.
    #[instrument(skip_all)]
    pub async fn load_theme(&self) -> bool {
        let _guard = self.write_lock.lock().await;
        match read_json::<_, bool>(self.storage.as_ref(), DARK_MODE_KEY).await {
            Ok(Some(dark_mode)) => {
                self.publish(dark_mode);
            }
            Ok(None) => debug!("No stored theme, keeping default"),
            Err(e) => error!(error = %e, "Failed to load theme"),
        }
        self.dark_mode()
    }

    /// Persist `dark_mode`, then apply it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if the write fails; the in-memory flag
    /// is unchanged in that case.
    #[instrument(skip_all, fields(dark_mode = dark_mode))]
    pub async fn set_dark_mode(&self, dark_mode: bool) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write_through(dark_mode).await
    }

    /// Flip the flag with the same write-through as
    /// [`set_dark_mode`](Self::set_dark_mode) and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if the write fails.
    #[instrument(skip_all)]
    pub async fn toggle_theme(&self) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let dark_mode = !self.dark_mode();
        self.write_through(dark_mode).await?;
        Ok(dark_mode)
    }

    async fn write_through(&self, dark_mode: bool) -> Result<(), StoreError> {
        write_json(self.storage.as_ref(), DARK_MODE_KEY, &dark_mode).await?;
        self.publish(dark_mode);
        Ok(())
    }

    fn publish(&self, dark_mode: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != dark_mode;
            *current = dark_mode;
            changed
        });
    }
}
