use std::sync::Arc;

use insight_store::Store;

#[derive(Clone)]
pub(crate) struct AppState {
    store: Store,
    endpoints: Arc<Vec<String>>,
    endpoints_meta: Arc<Vec<serde_json::Value>>,
    require_session: bool,
    session_ttl: chrono::Duration,
}

impl AppState {
    pub(crate) fn builder(store: Store) -> AppStateBuilder {
        AppStateBuilder {
            store,
            endpoints: None,
            endpoints_meta: None,
            require_session: false,
            session_ttl: chrono::Duration::hours(24),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn endpoints(&self) -> Arc<Vec<String>> {
        self.endpoints.clone()
    }

    pub fn endpoints_meta(&self) -> Arc<Vec<serde_json::Value>> {
        self.endpoints_meta.clone()
    }

    pub fn require_session(&self) -> bool {
        self.require_session
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        self.session_ttl
    }
}

pub(crate) struct AppStateBuilder {
    store: Store,
    endpoints: Option<Arc<Vec<String>>>,
    endpoints_meta: Option<Arc<Vec<serde_json::Value>>>,
    require_session: bool,
    session_ttl: chrono::Duration,
}

impl AppStateBuilder {
    pub(crate) fn with_endpoints(mut self, endpoints: Arc<Vec<String>>) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    pub(crate) fn with_endpoints_meta(mut self, meta: Arc<Vec<serde_json::Value>>) -> Self {
        self.endpoints_meta = Some(meta);
        self
    }

    pub(crate) fn with_require_session(mut self, require: bool) -> Self {
        self.require_session = require;
        self
    }

    pub(crate) fn with_session_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub(crate) fn build(self) -> AppState {
        AppState {
            store: self.store,
            endpoints: self.endpoints.unwrap_or_default(),
            endpoints_meta: self.endpoints_meta.unwrap_or_default(),
            require_session: self.require_session,
            session_ttl: self.session_ttl,
        }
    }
}
