//! services/client/src/guard.rs
//!
//! The route guard runs before every navigation. Unauthenticated users are sent to the
//! login route, and authenticated users are sent away from it.

use std::sync::Arc;
use tracing::{debug, error};
use voice_word_core::ports::{Navigator, PortError, PortResult};

use crate::auth::AuthSession;

pub const LOGIN_ROUTE: &str = "/login";
pub const HOME_ROUTE: &str = "/";

const MAX_REDIRECTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Allow,
    Redirect(String),
}

pub struct RouteGuard {
    auth: Arc<AuthSession>,
    navigator: Arc<dyn Navigator>,
}

impl RouteGuard {
    pub fn new(auth: Arc<AuthSession>, navigator: Arc<dyn Navigator>) -> Self {
        Self { auth, navigator }
    }

    /// Decides whether navigation to `to` may proceed. May hit `/auth/me` when a token
    /// is stored but no user has been fetched yet.
    pub async fn before_each(&self, to: &str) -> NavigationOutcome {
        let authenticated = self.auth.check_auth().await;

        if route_path(to) == LOGIN_ROUTE {
            if authenticated {
                return NavigationOutcome::Redirect(HOME_ROUTE.to_string());
            }
            return NavigationOutcome::Allow;
        }

        if !authenticated {
            return NavigationOutcome::Redirect(LOGIN_ROUTE.to_string());
        }
        NavigationOutcome::Allow
    }

    /// Runs the guard, follows its redirects and commits the final route.
    pub async fn navigate(&self, to: &str) -> PortResult<String> {
        let mut target = to.to_string();
        for _ in 0..=MAX_REDIRECTS {
            match self.before_each(&target).await {
                NavigationOutcome::Allow => {
                    self.navigator.push(&target);
                    return Ok(target);
                }
                NavigationOutcome::Redirect(next) => {
                    debug!("Guard redirected {} -> {}", target, next);
                    target = next;
                }
            }
        }
        error!("Too many redirects while navigating to {}", to);
        Err(PortError::Unexpected(format!("redirect loop navigating to {}", to)))
    }
}

/// The path component of a route, without query or fragment.
fn route_path(route: &str) -> &str {
    route.split(['?', '#']).next().unwrap_or(route)
}
