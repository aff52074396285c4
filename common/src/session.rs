//! Client-held session: the bearer token plus the cached role and display
//! name used for view gating.
//!
//! Storage is injected through [`SessionStore`] so that screens never touch
//! an ambient key-value store directly.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Role flag value the backend uses for administrators.
pub const ADMIN_ROLE_FLAG: &str = "0";

/// Role flag assumed when the backend cannot tell us.
pub const RESEARCHER_ROLE_FLAG: &str = "1";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot encode session: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("session store lock poisoned")]
    Poisoned,
}

// ─── Role ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Researcher,
}

impl Role {
    /// Anything other than the admin flag is a researcher.
    pub fn from_flag(flag: &str) -> Self {
        if flag.trim() == ADMIN_ROLE_FLAG {
            Role::Admin
        } else {
            Role::Researcher
        }
    }

    pub fn flag(&self) -> &'static str {
        match self {
            Role::Admin => ADMIN_ROLE_FLAG,
            Role::Researcher => RESEARCHER_ROLE_FLAG,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities { role: *self }
    }
}

/// What the signed-in user may do, resolved once from the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    role: Role,
}

impl Capabilities {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn can_administer(&self) -> bool {
        self.role == Role::Admin
    }

    /// Label shown next to the user name in the top bar.
    pub fn role_label(&self) -> &'static str {
        match self.role {
            Role::Admin => "Administrador",
            Role::Researcher => "Investigador",
        }
    }
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(rename = "role_id", with = "role_flag")]
    pub role: Role,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(default = "Utc::now")]
    pub last_active: DateTime<Utc>,
}

mod role_flag {
    use super::Role;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(role: &Role, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(role.flag())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Role, D::Error> {
        let flag = String::deserialize(d)?;
        Ok(Role::from_flag(&flag))
    }
}

impl Session {
    pub fn new(token: impl Into<String>, role: Role, user_name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            role,
            user_name: user_name.into(),
            last_active: Utc::now(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.role.capabilities()
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// Whether the session has been idle for at least `timeout` at `now`.
    pub fn is_idle_expired(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        let idle = now.signed_duration_since(self.last_active);
        match chrono::Duration::from_std(timeout) {
            Ok(limit) => idle >= limit,
            Err(_) => false,
        }
    }
}

// ─── Stores ──────────────────────────────────────────────────────────────────

/// Read/write/clear access to the persisted session.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>, SessionError>;
    fn save(&self, session: &Session) -> Result<(), SessionError>;
    /// Remove every session key.  Clearing an empty store succeeds.
    fn clear(&self) -> Result<(), SessionError>;

    fn token(&self) -> Result<Option<String>, SessionError> {
        Ok(self.load()?.map(|s| s.token))
    }
}

/// JSON file store, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        match serde_json::from_str::<Session>(&text) {
            Ok(s) if !s.token.is_empty() => Ok(Some(s)),
            Ok(_) => Ok(None),
            Err(e) => {
                warn!("Ignoring unreadable session file {}: {e}", self.path.display());
                Ok(None)
            }
        }
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let json = serde_json::to_string_pretty(session)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| self.io_err(e))?;
        restrict_permissions(&tmp);
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Session cleared ({})", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
        warn!("Cannot restrict permissions on {}: {e}", path.display());
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            inner: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        Ok(self.inner.lock().map_err(|_| SessionError::Poisoned)?.clone())
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        *self.inner.lock().map_err(|_| SessionError::Poisoned)? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.inner.lock().map_err(|_| SessionError::Poisoned)? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> FileSessionStore {
        let dir = std::env::temp_dir().join("birdia_session_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{name}.json"));
        std::fs::remove_file(&path).ok();
        FileSessionStore::new(path)
    }

    #[test]
    fn test_role_flags() {
        assert_eq!(Role::from_flag("0"), Role::Admin);
        assert_eq!(Role::from_flag("1"), Role::Researcher);
        assert_eq!(Role::from_flag("admin"), Role::Researcher);
        assert!(Role::Admin.capabilities().can_administer());
        assert!(!Role::Researcher.capabilities().can_administer());
        assert_eq!(Role::Researcher.capabilities().role_label(), "Investigador");
    }

    #[test]
    fn test_storage_keys() {
        let s = Session::new("abc", Role::Admin, "Ana");
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["token"], "abc");
        assert_eq!(json["role_id"], "0");
        assert_eq!(json["userName"], "Ana");
    }

    #[test]
    fn test_file_store_roundtrip_and_clear() {
        let store = temp_store("roundtrip");
        assert!(store.load().unwrap().is_none());

        let s = Session::new("tok", Role::Researcher, "Luis");
        store.save(&s).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.token, "tok");
        assert_eq!(loaded.role, Role::Researcher);
        assert_eq!(store.token().unwrap().as_deref(), Some("tok"));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_reads_as_no_session() {
        let store = temp_store("corrupt");
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_session_without_timestamp_loads() {
        let store = temp_store("legacy");
        std::fs::write(store.path(), r#"{"token":"t","role_id":"0","userName":"Root"}"#).unwrap();
        let s = store.load().unwrap().unwrap();
        assert_eq!(s.role, Role::Admin);
    }

    #[test]
    fn test_idle_expiry() {
        let mut s = Session::new("t", Role::Researcher, "x");
        let limit = Duration::from_secs(600);
        s.last_active = Utc::now() - chrono::Duration::seconds(601);
        assert!(s.is_idle_expired(limit, Utc::now()));
        s.touch();
        assert!(!s.is_idle_expired(limit, Utc::now()));
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySessionStore::new();
        assert!(store.token().unwrap().is_none());
        store.save(&Session::new("m", Role::Admin, "a")).unwrap();
        assert_eq!(store.token().unwrap().as_deref(), Some("m"));
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
