//! Persistent single-slot bearer token storage.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

/// Well-known storage key for the bearer token.
pub const TOKEN_STORAGE_KEY: &str = "token";

/// Key-value accessor for the one stored bearer token.
///
/// Writes replace any previous token (last write wins).
pub trait TokenStore: Send + Sync {
    /// Returns the stored token, if any.
    fn load(&self) -> Result<Option<String>, TokenStoreError>;
    /// Stores `token`, replacing the previous one.
    fn save(&self, token: &str) -> Result<(), TokenStoreError>;
    /// Removes the stored token. Clearing an empty store succeeds.
    fn clear(&self) -> Result<(), TokenStoreError>;
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(token.into())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        Ok(self.lock().clone())
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        *self.lock() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        *self.lock() = None;
        Ok(())
    }
}

/// Token store backed by a file named [`TOKEN_STORAGE_KEY`] in a state
/// directory.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Stores the token under `state_dir`. The directory is created lazily.
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(TOKEN_STORAGE_KEY),
        }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(TokenStoreError::Io(error)),
        }
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write-then-rename so readers never observe a partial token.
        let staging = self.path.with_extension("tmp");
        std::fs::write(&staging, token)?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(TokenStoreError::Io(error)),
        }
    }
}

/// Token persistence errors.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    /// Filesystem failure.
    #[error("token store io failure: {0}")]
    Io(#[from] std::io::Error),
}
