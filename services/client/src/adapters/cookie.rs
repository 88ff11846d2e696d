//! services/client/src/adapters/cookie.rs
//!
//! Token persistence adapters implementing the `TokenStore` port.
//!
//! `FileCookieStore` keeps the `auth_token` cookie on disk with the same attributes the
//! browser cookie carries (7-day max-age, `SameSite=Lax`, not `Secure`), so a session
//! survives restarts until the cookie expires. `MemoryTokenStore` lives only as long as
//! the process.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};
use voice_word_core::ports::{PortError, PortResult, TokenStore};

pub const AUTH_COOKIE_NAME: &str = "auth_token";

/// Cookie lifetime: 7 days.
pub fn default_max_age() -> Duration {
    Duration::days(7)
}

//=========================================================================================
// On-disk cookie record
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Lax,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCookie {
    name: String,
    value: String,
    expires_at: DateTime<Utc>,
    same_site: SameSite,
    secure: bool,
}

/// Writes `contents` readable by the owner only.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    // `mode` only applies on creation; an older file keeps its permissions otherwise.
    #[cfg(unix)]
    {
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)
}

//=========================================================================================
// FileCookieStore
//=========================================================================================

/// Persists the bearer token as a single JSON cookie record at `path`.
#[derive(Debug, Clone)]
pub struct FileCookieStore {
    path: PathBuf,
    max_age: Duration,
}

impl FileCookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_age: default_max_age(),
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_cookie(&self) -> Option<StoredCookie> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read cookie file {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_slice::<StoredCookie>(&raw) {
            Ok(cookie) if cookie.name == AUTH_COOKIE_NAME => Some(cookie),
            Ok(_) => None,
            Err(e) => {
                warn!("Ignoring malformed cookie file {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

impl TokenStore for FileCookieStore {
    fn load(&self) -> Option<String> {
        let cookie = self.read_cookie()?;
        if cookie.expires_at <= Utc::now() {
            debug!("Auth cookie expired at {}", cookie.expires_at);
            if let Err(e) = self.clear() {
                warn!("Failed to remove expired cookie: {}", e);
            }
            return None;
        }
        Some(cookie.value)
    }

    fn store(&self, token: &str) -> PortResult<()> {
        let cookie = StoredCookie {
            name: AUTH_COOKIE_NAME.to_string(),
            value: token.to_string(),
            expires_at: Utc::now() + self.max_age,
            same_site: SameSite::Lax,
            secure: false,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PortError::Storage(e.to_string()))?;
        }
        let json =
            serde_json::to_vec_pretty(&cookie).map_err(|e| PortError::Storage(e.to_string()))?;
        write_private(&self.path, &json).map_err(|e| PortError::Storage(e.to_string()))?;
        debug!("Auth cookie written to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> PortResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Storage(e.to_string())),
        }
    }
}

//=========================================================================================
// MemoryTokenStore
//=========================================================================================

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn store(&self, token: &str) -> PortResult<()> {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> PortResult<()> {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
