//! services/client/src/context.rs
//!
//! The composition root. One `ClientContext` owns the API client, the session, the route
//! guard and the records store, and is passed to whatever drives them.

use std::sync::Arc;
use voice_word_core::ports::{HttpTransport, Navigator, TokenStore};

use crate::adapters::{FileCookieStore, HistoryNavigator, ReqwestTransport};
use crate::api::ApiClient;
use crate::auth::AuthSession;
use crate::config::Config;
use crate::guard::RouteGuard;
use crate::store::RecordsStore;

#[derive(Clone)]
pub struct ClientContext {
    pub config: Arc<Config>,
    pub api: Arc<ApiClient>,
    pub navigator: Arc<dyn Navigator>,
    pub auth: Arc<AuthSession>,
    pub guard: Arc<RouteGuard>,
    pub records: Arc<RecordsStore>,
}

impl ClientContext {
    /// Wires the components over the given adapters.
    pub fn new(
        config: Arc<Config>,
        transport: Arc<dyn HttpTransport>,
        tokens: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let api = Arc::new(ApiClient::new(config.api_base.clone(), transport, tokens));
        let auth = Arc::new(AuthSession::new(api.clone(), navigator.clone()));
        let guard = Arc::new(RouteGuard::new(auth.clone(), navigator.clone()));
        let records = Arc::new(RecordsStore::new(api.clone()));
        Self {
            config,
            api,
            navigator,
            auth,
            guard,
            records,
        }
    }

    /// The production wiring: `reqwest` transport, on-disk cookie, in-process navigator.
    pub fn from_config(config: Config) -> Self {
        let tokens = Arc::new(FileCookieStore::new(config.token_path.clone()));
        Self::new(
            Arc::new(config),
            Arc::new(ReqwestTransport::default()),
            tokens,
            Arc::new(HistoryNavigator::default()),
        )
    }
}
