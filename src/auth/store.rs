//! Client-local persistence for the session: access token, refresh token and
//! the cached user record.

use crate::auth::models::User;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_KEY: &str = "user";

/// Everything persisted between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(rename = "access_token", default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(rename = "refresh_token", default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl StoredSession {
    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none() && self.user.is_none()
    }
}

/// Storage for the session tokens. Each call is one discrete step; last write wins.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<StoredSession>;
    fn persist(&self, session: &StoredSession) -> Result<()>;

    /// Store both tokens together
    fn save(&self, access: &str, refresh: &str) -> Result<()> {
        let mut session = self.load()?;
        session.access = Some(access.to_string());
        session.refresh = Some(refresh.to_string());
        self.persist(&session)
    }

    /// Replace only the access token (refresh without rotation)
    fn save_access(&self, access: &str) -> Result<()> {
        let mut session = self.load()?;
        session.access = Some(access.to_string());
        self.persist(&session)
    }

    fn save_user(&self, user: &User) -> Result<()> {
        let mut session = self.load()?;
        session.user = Some(user.clone());
        self.persist(&session)
    }

    /// Remove all three keys
    fn clear(&self) -> Result<()> {
        self.persist(&StoredSession::default())
    }

    fn get_access(&self) -> Result<Option<String>> {
        Ok(self.load()?.access)
    }

    fn get_refresh(&self) -> Result<Option<String>> {
        Ok(self.load()?.refresh)
    }

    fn get_user(&self) -> Result<Option<User>> {
        Ok(self.load()?.user)
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: RwLock<StoredSession>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: StoredSession) -> Self {
        Self {
            inner: RwLock::new(session),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<StoredSession> {
        Ok(self.inner.read().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn persist(&self, session: &StoredSession) -> Result<()> {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = session.clone();
        Ok(())
    }
}

/// JSON file holding the three keys. An empty session removes the file.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<StoredSession> {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);

        if !self.path.exists() {
            return Ok(StoredSession::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(StoredSession::default());
        }

        Ok(serde_json::from_str(&content)?)
    }

    fn persist(&self, session: &StoredSession) -> Result<()> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);

        if session.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
                tracing::debug!("Removed session file {}", self.path.display());
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        // Write to a sibling and rename so a crash never leaves half a file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(session)?)?;
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
