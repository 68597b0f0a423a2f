//! Durable storage for the session token pair.
//!
//! This module provides `TokenStore`, the single holder of the access
//! and refresh tokens. The pair lives in memory behind a `RwLock` and
//! is mirrored to `credentials.json` under the application data
//! directory, so a session survives process restarts until it is
//! explicitly cleared.
//!
//! File writes go through a temp-file-and-rename sequence with
//! owner-only permissions on Unix: a crash cannot leave a torn
//! credential file behind, and other users on the machine cannot read
//! the tokens.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Credential file name inside the data directory
const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// The persisted pair. Either side may be absent independently: a fresh
/// store holds neither, and a refresh updates only what the server sent
/// back. Token contents are opaque here - never parsed, never logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh: Option<String>,
}

/// Partial update applied by [`TokenStore::set_tokens`]. Only populated
/// fields change; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct TokenUpdate {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl TokenUpdate {
    /// Update both tokens, as after a login.
    pub fn pair(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: Some(access.into()),
            refresh: Some(refresh.into()),
        }
    }

    /// Update the access token only, as after a non-rotating refresh.
    pub fn access_only(access: impl Into<String>) -> Self {
        Self {
            access: Some(access.into()),
            refresh: None,
        }
    }
}

pub struct TokenStore {
    path: PathBuf,
    tokens: RwLock<StoredTokens>,
}

impl TokenStore {
    /// Open the store rooted at `dir`, loading any persisted pair.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::with_path(dir.as_ref().join(CREDENTIALS_FILE))
    }

    /// Open the store against an explicit file path. Tests use this to
    /// isolate sessions from each other; `open` is the production entry
    /// point.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tokens = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoredTokens::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            tokens: RwLock::new(tokens),
        })
    }

    /// The stored access token, if any.
    pub fn access(&self) -> Option<String> {
        self.read().access.clone()
    }

    /// The stored refresh token, if any.
    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh.clone()
    }

    /// Apply a partial update and persist the result.
    ///
    /// Readers never observe a half-applied pair: the swap happens under
    /// the write lock, and the lock is held across the file write so
    /// concurrent writers cannot interleave. The in-memory pair is
    /// updated even when the file write fails, so a disk error degrades
    /// durability rather than the live session.
    pub fn set_tokens(&self, update: TokenUpdate) -> Result<(), StoreError> {
        let mut guard = self.write();
        if let Some(access) = update.access {
            guard.access = Some(access);
        }
        if let Some(refresh) = update.refresh {
            guard.refresh = Some(refresh);
        }
        let snapshot = guard.clone();
        self.persist(&snapshot)
    }

    /// Remove both tokens and the credential file. Idempotent; memory is
    /// cleared even if the file removal fails.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut guard = self.write();
        *guard = StoredTokens::default();
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "credentials cleared");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoredTokens> {
        self.tokens.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoredTokens> {
        // A poisoned lock only means another writer panicked; the pair
        // itself is always a complete value.
        self.tokens.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the pair to disk atomically: temp file, permissions before
    /// content, fsync, rename.
    fn persist(&self, tokens: &StoredTokens) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("tmp");
        let contents = serde_json::to_string_pretty(tokens)?;

        let mut file = fs::File::create(&temp_path)?;

        // Restrict permissions before any token bytes hit the disk.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut permissions = file.metadata()?.permissions();
            permissions.set_mode(0o600);
            file.set_permissions(permissions)?;
        }

        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;

        debug!(path = %self.path.display(), "credentials persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> TokenStore {
        TokenStore::open(dir.path()).expect("open store")
    }

    #[test]
    fn test_fresh_store_holds_nothing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.access().is_none());
        assert!(store.refresh_token().is_none());
    }

    #[test]
    fn test_partial_update_keeps_the_other_field() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.set_tokens(TokenUpdate::pair("A1", "R1")).unwrap();
        store.set_tokens(TokenUpdate::access_only("A2")).unwrap();

        assert_eq!(store.access().as_deref(), Some("A2"));
        assert_eq!(store.refresh_token().as_deref(), Some("R1"));
    }

    #[test]
    fn test_refresh_only_update() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.set_tokens(TokenUpdate::pair("A1", "R1")).unwrap();
        store
            .set_tokens(TokenUpdate {
                access: None,
                refresh: Some("R2".to_string()),
            })
            .unwrap();

        assert_eq!(store.access().as_deref(), Some("A1"));
        assert_eq!(store.refresh_token().as_deref(), Some("R2"));
    }

    #[test]
    fn test_clear_removes_tokens_and_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.set_tokens(TokenUpdate::pair("A1", "R1")).unwrap();
        let path = dir.path().join(CREDENTIALS_FILE);
        assert!(path.exists());

        store.clear().unwrap();
        assert!(store.access().is_none());
        assert!(store.refresh_token().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.clear().unwrap();
        store.clear().unwrap();
    }

    #[test]
    fn test_pair_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = store_in(&dir);
            store.set_tokens(TokenUpdate::pair("A1", "R1")).unwrap();
        }

        let reopened = store_in(&dir);
        assert_eq!(reopened.access().as_deref(), Some("A1"));
        assert_eq!(reopened.refresh_token().as_deref(), Some("R1"));
    }

    #[cfg(unix)]
    #[test]
    fn test_credential_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.set_tokens(TokenUpdate::pair("A1", "R1")).unwrap();

        let metadata = std::fs::metadata(dir.path().join(CREDENTIALS_FILE)).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CREDENTIALS_FILE);
        std::fs::write(&path, "not json at all").unwrap();

        let result = TokenStore::with_path(&path);
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }
}
