//! File-backed credential storage.
//!
//! The bearer token is kept in a single file, by default
//! `<config dir>/papertrail/token`. On Unix the file is created with mode
//! `0600`.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use papertrail_core::{defaults, CredentialStore, Error, Result};
use papertrail_http::ClientConfig;
use tracing::debug;

/// Token persisted in a file so a session survives process restarts.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/papertrail/token`.
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| {
            Error::Storage("no configuration directory on this platform".to_string())
        })?;
        Ok(base.join(defaults::APP_DIR).join(defaults::TOKEN_FILE))
    }

    pub fn at_default_location() -> Result<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_error(&self, action: &str, e: std::io::Error) -> Error {
        Error::Storage(format!(
            "failed to {} token file {}: {}",
            action,
            self.path.display(),
            e
        ))
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.storage_error("read", e)),
        }
    }

    fn set(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.storage_error("create directory for", e))?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&self.path)
            .map_err(|e| self.storage_error("open", e))?;
        file.write_all(token.as_bytes())
            .map_err(|e| self.storage_error("write", e))?;

        debug!(path = %self.path.display(), "Stored credential token");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Removed credential token");
                Ok(())
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.storage_error("remove", e)),
        }
    }
}

/// Credential store selected by configuration: the configured token file,
/// or the platform default.
pub fn store_for_config(config: &ClientConfig) -> Result<Arc<dyn CredentialStore>> {
    let store = match &config.token_file {
        Some(path) => FileCredentialStore::new(path.clone()),
        None => FileCredentialStore::at_default_location()?,
    };
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_no_token() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token"));
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_set_get_clear() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested/dir/token"));

        store.set("tok-1").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("tok-1"));

        store.set("tok-2").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("tok-2"));

        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_survives_new_instance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token");
        FileCredentialStore::new(&path).set("persisted").unwrap();
        assert_eq!(
            FileCredentialStore::new(&path).get().unwrap().as_deref(),
            Some("persisted")
        );
    }

    #[test]
    fn test_blank_file_is_no_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  \n").unwrap();
        assert_eq!(FileCredentialStore::new(&path).get().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token");
        FileCredentialStore::new(&path).set("secret").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_store_for_config_uses_token_file() {
        let dir = TempDir::new().unwrap();
        let config = ClientConfig {
            token_file: Some(dir.path().join("t")),
            ..Default::default()
        };
        let store = store_for_config(&config).unwrap();
        store.set("x").unwrap();
        assert!(dir.path().join("t").exists());
    }
}
