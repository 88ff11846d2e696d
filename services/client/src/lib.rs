//! services/client/src/lib.rs
//!
//! Client library for the voice-word backend: API client, authentication session,
//! route guard and records store, wired together by `ClientContext`.

pub mod adapters;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, RequestOptions};
pub use auth::AuthSession;
pub use context::ClientContext;
pub use guard::{NavigationOutcome, RouteGuard, HOME_ROUTE, LOGIN_ROUTE};
pub use store::{RecordsState, RecordsStore};
