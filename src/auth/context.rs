//! Session state shared by every command: who is logged in, whether the
//! session is still loading, and the last error to show the user.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::auth::models::{ProfileUpdate, User};
use crate::error::{Error, Result};

/// `Loading → Unauthenticated → Authenticated → Unauthenticated`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Stored session not read yet
    Loading,
    Unauthenticated,
    Authenticated,
}

/// Snapshot of the persisted session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    /// Authenticated for display purposes only; the token is not verified here
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

pub struct AuthContext {
    client: Arc<ApiClient>,
    state: AuthState,
    user: Option<User>,
    error: Option<String>,
}

impl AuthContext {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: AuthState::Loading,
            user: None,
            error: None,
        }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    /// Read the persisted session
    pub fn session(&self) -> Result<Session> {
        let stored = self.client.store().load()?;
        Ok(Session {
            user: stored.user,
            access_token: stored.access,
            refresh_token: stored.refresh,
        })
    }

    /// Leave `Loading` using whatever the token store holds
    pub fn restore(&mut self) -> Result<AuthState> {
        let session = self.session()?;

        self.state = if session.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        };
        self.user = if session.is_authenticated() {
            session.user
        } else {
            None
        };

        tracing::debug!("Restored session: {:?}", self.state);
        Ok(self.state)
    }

    /// Log in and persist the session. On failure the previous session is kept
    /// and the backend's message is stored in [`AuthContext::error`].
    pub async fn login(&mut self, email: &str, password: &str) -> Result<&User> {
        let response = match self.client.login(email, password).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Login failed for {}: {}", email, e);
                self.error = Some(e.user_message());
                return Err(e);
            }
        };

        let store = self.client.store();
        store.save(&response.tokens.access, &response.tokens.refresh)?;
        store.save_user(&response.user)?;

        tracing::info!("Logged in as {}", response.user.email);
        self.state = AuthState::Authenticated;
        self.error = None;
        Ok(&*self.user.insert(response.user))
    }

    /// Tell the backend to drop the refresh token, then clear local state no
    /// matter what it answered.
    pub async fn logout(&mut self) -> Result<()> {
        let session = self.session().unwrap_or_default();

        if let (Some(_), Some(refresh)) = (&session.access_token, &session.refresh_token) {
            if let Err(e) = self.client.logout(refresh).await {
                tracing::warn!("Server-side logout failed: {}", e);
            }
        }

        self.end_session()?;
        self.error = None;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Fetch the profile and replace the cached user. An authentication
    /// failure that survived the token refresh ends the session.
    pub async fn reload_profile(&mut self) -> Result<&User> {
        let result = self.client.get_profile().await;
        self.accept_user(result)
    }

    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> Result<&User> {
        let result = self.client.update_profile(update).await;
        self.accept_user(result)
    }

    /// Pure lookup against the cached user; superusers hold every permission
    pub fn has_permission(&self, code: &str) -> bool {
        self.user.as_ref().is_some_and(|user| user.has_permission(code))
    }

    /// End the session when an authenticated call was still refused after the
    /// token refresh. Returns whether the session was ended.
    pub fn handle_rejection(&mut self, err: &Error) -> Result<bool> {
        if !err.is_unauthorized() {
            return Ok(false);
        }

        tracing::warn!("Session rejected by the server, logging out locally");
        self.end_session()?;
        Ok(true)
    }

    /// The cached user, for commands that cannot run logged out
    pub fn require_user(&self) -> Result<&User> {
        match (&self.state, &self.user) {
            (AuthState::Authenticated, Some(user)) => Ok(user),
            _ => Err(Error::NotAuthenticated),
        }
    }

    fn accept_user(&mut self, result: Result<User>) -> Result<&User> {
        match result {
            Ok(user) => {
                self.client.store().save_user(&user)?;
                self.error = None;
                self.state = AuthState::Authenticated;
                Ok(&*self.user.insert(user))
            }
            Err(e) => {
                self.error = Some(e.user_message());
                self.handle_rejection(&e)?;
                Err(e)
            }
        }
    }

    fn end_session(&mut self) -> Result<()> {
        self.client.store().clear()?;
        self.user = None;
        self.state = AuthState::Unauthenticated;
        Ok(())
    }
}
