//! Session and authentication state.

pub mod token_store;

use std::sync::{Arc, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::{TranslationBackend, User};
use crate::error::{Result, TransdocError, ValidationError};

pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(tag = "state", content = "user", rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated(User),
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// Holds the signed-in identity and keeps the backend's bearer token in sync.
pub struct Session {
    backend: Arc<dyn TranslationBackend>,
    tokens: Arc<dyn TokenStore>,
    state: RwLock<SessionState>,
}

impl Session {
    pub fn new(backend: Arc<dyn TranslationBackend>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            backend,
            tokens,
            state: RwLock::new(SessionState::Anonymous),
        }
    }

    pub fn state(&self) -> SessionState {
        match self.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.state().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// Returns the signed-in user or `Unauthenticated`.
    pub fn require_user(&self) -> Result<User> {
        self.current_user().ok_or(TransdocError::Unauthenticated)
    }

    fn set_state(&self, state: SessionState) {
        let mut guard = match self.state.write() {
            Ok(g) => g,
            Err(poisoned) => {
                warn!("Session lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        *guard = state;
    }

    /// Signs in with username and password.
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ValidationError::MissingCredentials.into());
        }

        self.set_state(SessionState::Authenticating);

        match self.backend.login(username.trim(), password).await {
            Ok(login) => {
                self.backend.set_bearer_token(Some(SecretString::from(
                    login.token.expose_secret().to_string(),
                )));
                if let Err(e) = self.tokens.save(&login.token) {
                    // The session still works for this run.
                    warn!("Failed to persist session token: {}", e);
                }
                info!("Signed in as {}", login.user.username);
                self.set_state(SessionState::Authenticated(login.user.clone()));
                Ok(login.user)
            }
            Err(e) => {
                warn!("Login failed for {}: {}", username, e);
                self.set_state(SessionState::Anonymous);
                Err(e)
            }
        }
    }

    /// Silent session check on start-up. Never fails; problems mean anonymous.
    /// The stored token is only discarded when the backend rejects it.
    pub async fn restore(&self) -> SessionState {
        let token = match self.tokens.load() {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No stored session token");
                self.set_state(SessionState::Anonymous);
                return SessionState::Anonymous;
            }
            Err(e) => {
                warn!("Failed to read stored session token: {}", e);
                self.set_state(SessionState::Anonymous);
                return SessionState::Anonymous;
            }
        };

        self.set_state(SessionState::Authenticating);
        self.backend.set_bearer_token(Some(token));

        match self.backend.current_user().await {
            Ok(user) => {
                info!("Restored session for {}", user.username);
                let state = SessionState::Authenticated(user);
                self.set_state(state.clone());
                state
            }
            Err(e) if e.is_unauthorized() => {
                debug!("Stored session is no longer valid: {}", e);
                self.drop_credentials();
                self.set_state(SessionState::Anonymous);
                SessionState::Anonymous
            }
            Err(e) => {
                // Keep the stored token so the next start can try again.
                warn!("Could not verify stored session: {}", e);
                self.backend.set_bearer_token(None);
                self.set_state(SessionState::Anonymous);
                SessionState::Anonymous
            }
        }
    }

    /// Signs out. The local token is cleared whatever the backend says.
    pub async fn logout(&self) {
        if self.is_authenticated() {
            if let Err(e) = self.backend.logout().await {
                warn!("Logout request failed, clearing session anyway: {}", e);
            }
        }
        self.drop_credentials();
        self.set_state(SessionState::Anonymous);
        info!("Signed out");
    }

    fn drop_credentials(&self) {
        self.backend.set_bearer_token(None);
        if let Err(e) = self.tokens.clear() {
            warn!("Failed to clear stored session token: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "1".to_string(),
            username: "alice".to_string(),
            email: None,
            display_name: Some("Alice".to_string()),
            is_email_user: false,
        }
    }

    #[test]
    fn test_session_state_user() {
        assert!(SessionState::Anonymous.user().is_none());
        assert!(!SessionState::Authenticating.is_authenticated());

        let state = SessionState::Authenticated(user());
        assert!(state.is_authenticated());
        assert_eq!(state.user().map(|u| u.label()), Some("Alice"));
    }

    #[test]
    fn test_session_state_serializes_with_tag() {
        let json = serde_json::to_value(SessionState::Authenticated(user())).unwrap();
        assert_eq!(json["state"], "authenticated");
        assert_eq!(json["user"]["username"], "alice");

        let json = serde_json::to_value(SessionState::Anonymous).unwrap();
        assert_eq!(json["state"], "anonymous");
    }
}
