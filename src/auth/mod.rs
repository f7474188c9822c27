use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Credentials kept for the lifetime of a login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user_id: Option<u64>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read session file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write session file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("session file '{path}' is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Where requests get their bearer token from. Injected into the API client
/// instead of being looked up from ambient global storage.
pub trait TokenProvider: Send + Sync {
    fn load(&self) -> Result<Option<Session>, SessionError>;
    fn save(&self, session: &Session) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    session: RwLock<Option<Session>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

impl TokenProvider for MemoryTokenStore {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        let guard = self.session.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        let mut guard = self.session.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        let mut guard = self.session.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
        Ok(())
    }
}

/// Session persisted as JSON so separate CLI invocations share one login.
#[derive(Clone, Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }
}

impl TokenProvider for FileTokenStore {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SessionError::Read {
                    path: self.display(),
                    source: e,
                })
            }
        };
        if contents.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| SessionError::Corrupt {
                path: self.display(),
                source: e,
            })
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SessionError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        let body = serde_json::to_vec_pretty(session).map_err(|e| SessionError::Corrupt {
            path: self.display(),
            source: e,
        })?;
        std::fs::write(&self.path, body).map_err(|e| SessionError::Write {
            path: self.display(),
            source: e,
        })
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Write {
                path: self.display(),
                source: e,
            }),
        }
    }
}

/// Handle passed to every network-call constructor.
#[derive(Clone)]
pub struct AuthContext {
    tokens: Arc<dyn TokenProvider>,
}

impl AuthContext {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self { tokens }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    pub fn session(&self) -> Result<Option<Session>, SessionError> {
        self.tokens.load()
    }

    pub fn access_token(&self) -> Result<Option<String>, SessionError> {
        Ok(self.session()?.map(|s| s.access_token))
    }

    pub fn user_id(&self) -> Result<Option<u64>, SessionError> {
        Ok(self.session()?.and_then(|s| s.user_id))
    }

    pub fn store(&self, session: &Session) -> Result<(), SessionError> {
        self.tokens.save(session)
    }

    /// Swaps in a new access token, keeping refresh token and user id.
    /// Returns false when there is no session to update.
    pub fn replace_access_token(&self, access_token: String) -> Result<bool, SessionError> {
        match self.session()? {
            Some(mut session) => {
                session.access_token = access_token;
                self.tokens.save(&session)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        self.tokens.clear()
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext").finish_non_exhaustive()
    }
}
