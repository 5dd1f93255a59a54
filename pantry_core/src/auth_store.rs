use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fixed key for the credential string in the persisted file.
pub const TOKEN_KEY: &str = "access_token";
/// Fixed key for the locally recorded issuance time.
pub const ISSUED_AT_KEY: &str = "issued_at";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("persist error: {0}")]
    Persist(String),
}

/// The only state that survives a restart: the token and when we received it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    #[serde(rename = "access_token")]
    pub token: String,
    #[serde(rename = "issued_at")]
    pub issued_at: DateTime<Utc>,
}

pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Option<StoredCredential>;
    fn save(&self, credential: &StoredCredential) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// A simple in-memory store, mainly for testing.
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: std::sync::Mutex<Option<StoredCredential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<StoredCredential> {
        self.slot.lock().ok()?.clone()
    }
    fn save(&self, credential: &StoredCredential) -> Result<(), StoreError> {
        *self
            .slot
            .lock()
            .map_err(|e| StoreError::Persist(format!("lock poisoned: {}", e)))? =
            Some(credential.clone());
        Ok(())
    }
    fn clear(&self) -> Result<(), StoreError> {
        *self
            .slot
            .lock()
            .map_err(|e| StoreError::Persist(format!("lock poisoned: {}", e)))? = None;
        Ok(())
    }
}

/// A file-backed JSON store at `~/.config/pantry/credentials.json` (Unix)
/// or `%APPDATA%/pantry/credentials.json` (Windows).
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new_default() -> Self {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join("pantry").join("credentials.json"),
        }
    }

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, credential: &StoredCredential) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| StoreError::Unavailable(format!("{}: {}", dir.display(), e)))?;
        }
        let s = serde_json::to_string_pretty(credential)
            .map_err(|e| StoreError::Persist(format!("serde: {}", e)))?;
        std::fs::write(&self.path, &s).map_err(|e| StoreError::Persist(e.to_string()))?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)
                .map_err(|e| StoreError::Persist(format!("chmod: {}", e)))?;
        }

        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<StoredCredential> {
        let s = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&s) {
            Ok(credential) => Some(credential),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable credential file");
                None
            }
        }
    }

    fn save(&self, credential: &StoredCredential) -> Result<(), StoreError> {
        self.write(credential)
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Persist(e.to_string())),
        }
    }
}
