//! services/client/src/auth.rs
//!
//! The authentication session: who is logged in, and the bearer token that proves it.
//!
//! The token lives in the `TokenStore` (the persisted cookie) while the user is only
//! ever held in memory and re-derived from `GET /auth/me`. A session counts as
//! authenticated only once a user has been fetched successfully.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use voice_word_core::domain::{LoginRequest, LoginResponse, User};
use voice_word_core::ports::{HttpMethod, Navigator, PortResult};

use crate::api::{ApiClient, RequestOptions};
use crate::guard::LOGIN_ROUTE;

pub struct AuthSession {
    api: Arc<ApiClient>,
    navigator: Arc<dyn Navigator>,
    user: watch::Sender<Option<User>>,
}

impl AuthSession {
    pub fn new(api: Arc<ApiClient>, navigator: Arc<dyn Navigator>) -> Self {
        let (user, _) = watch::channel(None);
        Self {
            api,
            navigator,
            user,
        }
    }

    /// The cached user, if one has been fetched.
    pub fn user(&self) -> Option<User> {
        self.user.borrow().clone()
    }

    /// Recomputed from the cached user on every call; a bare token is not enough.
    pub fn is_authenticated(&self) -> bool {
        self.user.borrow().is_some()
    }

    /// Observers are notified on every login, logout and identity refresh.
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.user.subscribe()
    }

    pub fn token(&self) -> Option<String> {
        self.api.token()
    }

    /// Exchanges credentials for a token, stores it, then fetches the user with it.
    ///
    /// If the identity fetch fails the new token is discarded again, so a failed login
    /// never leaves a token without a user behind.
    pub async fn login(&self, username: &str, password: &str) -> PortResult<LoginResponse> {
        let credentials = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let options = RequestOptions::method(HttpMethod::Post)
            .json(&credentials)?
            .anonymous();
        let data: LoginResponse = self.api.request("/auth/login", options).await?;

        self.api.tokens().store(&data.access_token)?;

        let whoami = RequestOptions::default()
            .header("Authorization", format!("Bearer {}", data.access_token));
        match self.api.request::<User>("/auth/me", whoami).await {
            Ok(user) => {
                info!("Logged in as {}", user.username);
                self.user.send_replace(Some(user));
                Ok(data)
            }
            Err(e) => {
                warn!("Identity fetch after login failed, discarding token: {}", e);
                self.clear_session();
                Err(e)
            }
        }
    }

    /// Drops the token and user locally and sends the app to the login route.
    /// The backend keeps no session state, so nothing is sent to it.
    pub fn logout(&self) {
        self.clear_session();
        info!("Logged out");
        self.navigator.push(LOGIN_ROUTE);
    }

    /// Refreshes the user from the backend. Any failure ends the session.
    pub async fn fetch_user(&self) -> Option<User> {
        let Some(token) = self.api.token() else {
            self.user.send_replace(None);
            return None;
        };

        let options =
            RequestOptions::default().header("Authorization", format!("Bearer {}", token));
        match self.api.request::<User>("/auth/me", options).await {
            Ok(user) => {
                self.user.send_replace(Some(user.clone()));
                Some(user)
            }
            Err(e) => {
                warn!("Stored token rejected, clearing session: {}", e);
                self.clear_session();
                None
            }
        }
    }

    /// Hydrates the user from a stored token when needed, then reports the status.
    pub async fn check_auth(&self) -> bool {
        if self.api.token().is_some() && !self.is_authenticated() {
            self.fetch_user().await;
        }
        self.is_authenticated()
    }

    fn clear_session(&self) {
        if let Err(e) = self.api.tokens().clear() {
            warn!("Failed to clear stored token: {}", e);
        }
        self.user.send_replace(None);
    }
}
