use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::token::Credentials;

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Durable backing for the credential pair.
pub trait CredentialStorage: Send + Sync {
    fn load(&self) -> Result<Credentials, AuthError>;
    fn save(&self, credentials: &Credentials) -> Result<(), AuthError>;
    fn clear(&self) -> Result<(), AuthError>;
}

/// File-backed credential storage using a TOML file.
///
/// The file holds the two values under the [`ACCESS_TOKEN_KEY`] and
/// [`REFRESH_TOKEN_KEY`] keys and survives process restarts.
#[derive(Debug, Clone)]
pub struct FileCredentialStorage {
    path: PathBuf,
}

impl FileCredentialStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn new_default() -> Self {
        Self::new(default_credentials_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(path: &Path) -> Result<(), AuthError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

impl CredentialStorage for FileCredentialStorage {
    fn load(&self) -> Result<Credentials, AuthError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Credentials::default())
            }
            Err(err) => return Err(AuthError::Io(err.to_string())),
        };
        let file: CredentialFile = toml::from_str(&raw)?;
        Ok(Credentials {
            access_token: file.access_token,
            refresh_token: file.refresh_token,
        })
    }

    fn save(&self, credentials: &Credentials) -> Result<(), AuthError> {
        Self::ensure_parent(&self.path)?;
        let file = CredentialFile {
            version: 1,
            access_token: credentials.access_token.clone(),
            refresh_token: credentials.refresh_token.clone(),
            saved_at: Utc::now(),
        };
        fs::write(&self.path, toml::to_string(&file)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Io(err.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CredentialFile {
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    saved_at: DateTime<Utc>,
}

/// Process-local storage; nothing outlives the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStorage {
    credentials: Mutex<Credentials>,
}

impl MemoryCredentialStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: Mutex::new(credentials),
        }
    }
}

impl CredentialStorage for MemoryCredentialStorage {
    fn load(&self) -> Result<Credentials, AuthError> {
        Ok(self.credentials.lock().clone())
    }

    fn save(&self, credentials: &Credentials) -> Result<(), AuthError> {
        *self.credentials.lock() = credentials.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.credentials.lock() = Credentials::default();
        Ok(())
    }
}

/// Single source of truth for credential presence and values.
///
/// One instance is shared (via `Arc`) by the HTTP client, the route guard and
/// the auth session, so every reader observes the same pair. Writes go to
/// memory and through to the backing [`CredentialStorage`] under one lock.
///
/// # Example
/// ```
/// use aichat::auth::TokenStore;
///
/// let store = TokenStore::in_memory();
/// store.set("access", "refresh")?;
/// assert!(store.has_stored_token());
/// store.clear()?;
/// assert!(!store.has_stored_token());
/// # Ok::<(), aichat::auth::AuthError>(())
/// ```
pub struct TokenStore {
    storage: Arc<dyn CredentialStorage>,
    current: RwLock<Credentials>,
}

impl TokenStore {
    /// Open a store over `storage`, loading any persisted credentials.
    pub fn open(storage: Arc<dyn CredentialStorage>) -> Result<Self, AuthError> {
        let current = storage.load()?;
        Ok(Self {
            storage,
            current: RwLock::new(current),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            storage: Arc::new(MemoryCredentialStorage::new()),
            current: RwLock::new(Credentials::default()),
        }
    }

    /// Current values. No side effects.
    pub fn read(&self) -> Credentials {
        self.current.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.current.read().refresh_token.clone()
    }

    /// Presence check only; says nothing about server-side validity.
    pub fn has_stored_token(&self) -> bool {
        self.current.read().access_token.is_some()
    }

    /// `Bearer <access>` for the next request, if logged in.
    pub fn authorization(&self) -> Option<String> {
        self.current
            .read()
            .access_token
            .as_deref()
            .map(|token| format!("Bearer {token}"))
    }

    /// Store a fresh pair, as returned by login or registration.
    ///
    /// Memory only changes once storage accepted the pair.
    pub fn set(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Result<(), AuthError> {
        let mut current = self.current.write();
        let next = Credentials::new(access_token, refresh_token);
        self.storage.save(&next)?;
        *current = next;
        Ok(())
    }

    /// Replace the access token, leaving the refresh token untouched.
    pub fn set_access_token(&self, access_token: impl Into<String>) -> Result<(), AuthError> {
        let mut current = self.current.write();
        let next = Credentials {
            access_token: Some(access_token.into()),
            refresh_token: current.refresh_token.clone(),
        };
        self.storage.save(&next)?;
        *current = next;
        Ok(())
    }

    /// Erase both values from memory and storage.
    ///
    /// Memory is cleared even when storage fails, so this process stops
    /// sending the credentials; the error still reports that a later
    /// [`open`](Self::open) may load them again.
    pub fn clear(&self) -> Result<(), AuthError> {
        let mut current = self.current.write();
        *current = Credentials::default();
        self.storage.clear()
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("current", &*self.current.read())
            .finish_non_exhaustive()
    }
}

/// `~/.aichat/credentials.toml`, or a relative fallback without a home dir.
pub fn default_credentials_path() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".aichat"))
        .unwrap_or_else(|| PathBuf::from(".aichat"))
        .join("credentials.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file_store() -> (TempDir, Arc<FileCredentialStorage>) {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(FileCredentialStorage::new(dir.path().join("creds.toml")));
        (dir, storage)
    }

    #[test]
    fn pair_survives_reopen() {
        let (_dir, storage) = file_store();
        let store = TokenStore::open(storage.clone()).unwrap();
        store.set("access", "refresh").unwrap();

        let reopened = TokenStore::open(storage).unwrap();
        assert_eq!(reopened.read(), Credentials::new("access", "refresh"));
    }

    #[test]
    fn persisted_file_uses_fixed_keys() {
        let (_dir, storage) = file_store();
        let store = TokenStore::open(storage.clone()).unwrap();
        store.set("a1", "r1").unwrap();

        let raw = fs::read_to_string(storage.path()).unwrap();
        let table: toml::Table = toml::from_str(&raw).unwrap();
        assert_eq!(table[ACCESS_TOKEN_KEY].as_str(), Some("a1"));
        assert_eq!(table[REFRESH_TOKEN_KEY].as_str(), Some("r1"));
    }

    #[test]
    fn set_access_token_keeps_refresh_token() {
        let (_dir, storage) = file_store();
        let store = TokenStore::open(storage.clone()).unwrap();
        store.set("A", "R").unwrap();
        store.set_access_token("A2").unwrap();

        assert_eq!(store.read(), Credentials::new("A2", "R"));
        assert_eq!(storage.load().unwrap(), Credentials::new("A2", "R"));
        assert_eq!(store.authorization().as_deref(), Some("Bearer A2"));
    }

    #[test]
    fn clear_removes_memory_and_file() {
        let (_dir, storage) = file_store();
        let store = TokenStore::open(storage.clone()).unwrap();
        store.set("A", "R").unwrap();
        store.clear().unwrap();

        assert!(!store.has_stored_token());
        assert!(store.refresh_token().is_none());
        assert!(!storage.path().exists());
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn missing_file_loads_empty() {
        let (_dir, storage) = file_store();
        let store = TokenStore::open(storage).unwrap();
        assert_eq!(store.read(), Credentials::default());
    }

    struct BrokenStorage {
        initial: Credentials,
    }

    impl CredentialStorage for BrokenStorage {
        fn load(&self) -> Result<Credentials, AuthError> {
            Ok(self.initial.clone())
        }

        fn save(&self, _credentials: &Credentials) -> Result<(), AuthError> {
            Err(AuthError::Io("disk full".into()))
        }

        fn clear(&self) -> Result<(), AuthError> {
            Err(AuthError::Io("read-only".into()))
        }
    }

    fn broken_store() -> TokenStore {
        TokenStore::open(Arc::new(BrokenStorage {
            initial: Credentials::new("OLD", "R"),
        }))
        .unwrap()
    }

    #[test]
    fn failed_save_leaves_memory_untouched() {
        let store = broken_store();

        assert!(store.set("NEW", "R2").is_err());
        assert_eq!(store.read(), Credentials::new("OLD", "R"));

        assert!(store.set_access_token("NEW").is_err());
        assert_eq!(store.authorization().as_deref(), Some("Bearer OLD"));
    }

    #[test]
    fn failed_clear_still_forgets_in_memory() {
        let store = broken_store();
        assert!(store.clear().is_err());
        assert_eq!(store.read(), Credentials::default());
    }

    #[test]
    fn refresh_token_alone_is_not_authenticated() {
        let storage = Arc::new(MemoryCredentialStorage::with_credentials(Credentials {
            access_token: None,
            refresh_token: Some("R".into()),
        }));
        let store = TokenStore::open(storage).unwrap();
        assert!(!store.has_stored_token());
        assert_eq!(store.refresh_token().as_deref(), Some("R"));
    }
}
