//! Session token ownership and view admission.
//!
//! `SessionGuard` is the only writer of the token. Every other component holds
//! a `SessionContext` and reads the token through it immediately before each
//! request, so a sign-out takes effect on the very next call.
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

use crate::error::{AuthError, GatewayError};
use crate::gateway::Gateway;

/// Durable storage for the bearer token.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> std::io::Result<Option<String>>;
    fn save(&self, token: &str) -> std::io::Result<()>;
    fn clear(&self) -> std::io::Result<()>;
}

/// Token kept as plain text in a single named file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self::at(dir.as_ref().join(key))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> std::io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn save(&self, token: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, token)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

/// In-process token storage, used by tests and embedders without a disk.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> std::io::Result<Option<String>> {
        Ok(self.token.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, token: &str) -> std::io::Result<()> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

/// Read-only view of the session handed to components that make requests.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn TokenStore>,
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("authenticated", &self.token().is_some())
            .finish()
    }
}

impl SessionContext {
    /// Current token, read from durable storage on every call.
    pub fn token(&self) -> Option<String> {
        match self.store.load() {
            Ok(token) => token,
            Err(err) => {
                warn!(?err, "failed to read session token");
                None
            }
        }
    }
}

/// Views of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Jobs,
    Popups,
}

impl View {
    pub fn is_gated(&self) -> bool {
        !matches!(self, View::Login)
    }
}

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Owner of the session token.
pub struct SessionGuard {
    store: Arc<dyn TokenStore>,
}

impl SessionGuard {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    pub fn context(&self) -> SessionContext {
        SessionContext {
            store: Arc::clone(&self.store),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.context().token().is_some()
    }

    /// Where a request to mount `requested` actually lands.
    ///
    /// Gated views without a token go to the login view; the login view with a
    /// token goes to the jobs view.
    pub fn admit(&self, requested: View) -> View {
        match (requested.is_gated(), self.is_authenticated()) {
            (true, false) => View::Login,
            (false, true) => View::Jobs,
            _ => requested,
        }
    }

    #[instrument(skip_all, fields(username = %credentials.username))]
    pub async fn login(
        &self,
        gateway: &dyn Gateway,
        credentials: &Credentials,
    ) -> Result<(), AuthError> {
        let token = gateway
            .login(credentials)
            .await
            .map_err(classify_login_error)?;
        self.store.save(&token)?;
        info!("logged in");
        Ok(())
    }

    /// Drop the token. Succeeds even when no token is stored.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.store.clear()?;
        info!("logged out");
        Ok(())
    }
}

fn classify_login_error(err: GatewayError) -> AuthError {
    match err {
        GatewayError::Timeout | GatewayError::Network(_) | GatewayError::InvalidUrl(_) => {
            AuthError::Offline(err.to_string())
        }
        GatewayError::MissingToken => AuthError::MissingToken,
        GatewayError::Decode(detail) => AuthError::Rejected(detail),
        GatewayError::Status { status, body } => {
            let lower = body.to_lowercase();
            if lower.contains("username") {
                AuthError::InvalidUsername
            } else if lower.contains("password") {
                AuthError::InvalidPassword
            } else if body.trim().is_empty() {
                AuthError::Rejected(status.to_string())
            } else {
                AuthError::Rejected(body)
            }
        }
    }
}
