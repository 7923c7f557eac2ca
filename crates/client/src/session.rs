//! Explicit session object and its file persistence.
//!
//! Identity is a plain pseudo string: unset at start, set by a
//! successful login, cleared by logout. It is passed explicitly to
//! every backend call (there is deliberately no process-global mutable
//! identity) and persisted to a small JSON file so it survives a
//! restart, the way a browser session survives a reload.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// The backend rejects pseudos shorter than this after trimming; the
/// client mirrors the rule to fail fast.
const MIN_PSEUDO_LEN: usize = 2;

/// An authenticated identity. Construction goes through
/// [`Session::new`], which applies the pseudo validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pseudo: String,
}

impl Session {
    /// Validate and wrap a pseudo. The pseudo is trimmed; anything
    /// shorter than two characters is rejected.
    pub fn new(pseudo: &str) -> Result<Self, ClientError> {
        let trimmed = pseudo.trim();
        if trimmed.len() < MIN_PSEUDO_LEN {
            return Err(ClientError::InvalidPseudo(format!(
                "pseudo must be at least {MIN_PSEUDO_LEN} characters"
            )));
        }
        Ok(Self {
            pseudo: trimmed.to_string(),
        })
    }

    /// The identity string sent as the `X-User-Pseudo` header.
    pub fn pseudo(&self) -> &str {
        &self.pseudo
    }
}

/// File persistence for the current session.
///
/// Follows the same recovery policy as the batch store: a missing or
/// corrupt file simply means "not logged in", and persistence failures
/// are logged and absorbed, never failing a login or logout.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restore the persisted session, if any.
    pub fn load(&self) -> Option<Session> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Could not read session file");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Corrupt session file, ignoring");
                None
            }
        }
    }

    /// Persist the session for the next restart.
    pub fn save(&self, session: &Session) {
        let write = || -> io::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_string(session).map_err(io::Error::other)?;
            fs::write(&self.path, json)
        };
        if let Err(e) = write() {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to persist session");
        }
    }

    /// Forget the persisted session.
    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to clear session file");
            }
        }
    }
}
