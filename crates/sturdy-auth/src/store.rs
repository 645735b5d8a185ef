//! Write-through token storage.
//!
//! The current access token is held in memory and mirrored into a file on
//! disk, the client's equivalent of the browser's persistent local storage.
//! Both copies are mutated through the single [`TokenStore::set`] path so
//! they can never diverge.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use sturdy_core::config::auth::AuthConfig;
use sturdy_core::error::{AppError, ErrorKind};
use sturdy_core::result::AppResult;

/// Holds the current access token in memory with a persistent file mirror.
#[derive(Debug, Clone)]
pub struct TokenStore {
    /// In-memory copy, shared across clones of the store.
    token: Arc<RwLock<Option<String>>>,
    /// File mirroring the in-memory copy.
    path: PathBuf,
}

impl TokenStore {
    /// Creates a store persisting to the configured token path.
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_path(&config.token_path)
    }

    /// Creates a store persisting to an explicit path.
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            token: Arc::new(RwLock::new(None)),
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Stores a token in memory and on disk, or clears both when `None`.
    pub fn set(&self, token: Option<&str>) -> AppResult<()> {
        match token {
            Some(token) => {
                if let Some(parent) = self.path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        AppError::with_source(ErrorKind::Storage, "Failed to persist access token", e)
                    })?;
                }
                std::fs::write(&self.path, token).map_err(|e| {
                    AppError::with_source(ErrorKind::Storage, "Failed to persist access token", e)
                })?;
                *self.write_guard() = Some(token.to_string());
            }
            None => {
                match std::fs::remove_file(&self.path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(AppError::with_source(
                            ErrorKind::Storage,
                            "Failed to clear access token",
                            e,
                        ));
                    }
                }
                *self.write_guard() = None;
            }
        }
        Ok(())
    }

    /// Returns the in-memory token, if any.
    pub fn get(&self) -> Option<String> {
        self.read_guard().clone()
    }

    /// Reads the persisted token without adopting it into memory.
    ///
    /// A missing file is not an error; anything else is surfaced so the
    /// caller can decide how to degrade.
    pub fn load_persisted(&self) -> AppResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(token) => Ok(Some(token)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                "Failed to read persisted access token",
                e,
            )),
        }
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, Option<String>> {
        self.token.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Option<String>> {
        self.token.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> (TokenStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::with_path(dir.path().join("auth/access_token"));
        (store, dir)
    }

    #[test]
    fn test_set_roundtrip_memory_and_disk() {
        let (store, _dir) = make_store();
        store.set(Some("tok-123")).unwrap();

        assert_eq!(store.get(), Some("tok-123".to_string()));
        assert_eq!(store.load_persisted().unwrap(), Some("tok-123".to_string()));
    }

    #[test]
    fn test_set_none_clears_both() {
        let (store, _dir) = make_store();
        store.set(Some("tok-123")).unwrap();
        store.set(None).unwrap();

        assert_eq!(store.get(), None);
        assert_eq!(store.load_persisted().unwrap(), None);
    }

    #[test]
    fn test_clear_when_nothing_persisted_is_ok() {
        let (store, _dir) = make_store();
        store.set(None).unwrap();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_overwrite_replaces_prior_value() {
        let (store, _dir) = make_store();
        store.set(Some("old")).unwrap();
        store.set(Some("new")).unwrap();

        assert_eq!(store.get(), Some("new".to_string()));
        assert_eq!(store.load_persisted().unwrap(), Some("new".to_string()));
    }
}
