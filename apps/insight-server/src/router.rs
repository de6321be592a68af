use std::mem;

use axum::{
    handler::Handler,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

use crate::{api, AppState};

#[derive(Copy, Clone)]
pub(crate) enum Stability {
    Stable,
    Beta,
}

impl Stability {
    fn as_str(self) -> &'static str {
        match self {
            Stability::Stable => "stable",
            Stability::Beta => "beta",
        }
    }
}

/// Router that also records an endpoint index for `/about`.
pub(crate) struct RouterBuilder {
    router: Router<AppState>,
    endpoints: Vec<String>,
    endpoints_meta: Vec<Value>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            endpoints: Vec::new(),
            endpoints_meta: Vec::new(),
        }
    }

    fn record(&mut self, method: &str, path: &'static str, stability: Option<Stability>) {
        self.endpoints.push(format!("{} {}", method, path));
        if let Some(stability) = stability {
            self.endpoints_meta.push(json!({
                "method": method,
                "path": path,
                "stability": stability.as_str(),
            }));
        }
    }

    pub fn route_get<H, T>(
        &mut self,
        path: &'static str,
        handler: H,
        stability: Option<Stability>,
    ) -> &mut Self
    where
        H: Handler<T, AppState> + Clone + 'static,
        T: Send + 'static,
    {
        self.record("GET", path, stability);
        let router = mem::take(&mut self.router);
        self.router = router.route(path, get(handler));
        self
    }

    pub fn route_post<H, T>(
        &mut self,
        path: &'static str,
        handler: H,
        stability: Option<Stability>,
    ) -> &mut Self
    where
        H: Handler<T, AppState> + Clone + 'static,
        T: Send + 'static,
    {
        self.record("POST", path, stability);
        let router = mem::take(&mut self.router);
        self.router = router.route(path, post(handler));
        self
    }

    pub fn build(self) -> (Router<AppState>, Vec<String>, Vec<Value>) {
        (self.router, self.endpoints, self.endpoints_meta)
    }
}

pub(crate) mod paths {
    pub const HEALTHZ: &str = "/healthz";
    pub const ABOUT: &str = "/about";
    pub const SPEC_OPENAPI: &str = "/spec/openapi.json";
    pub const DASHBOARD: &str = "/api/dashboard";
    pub const DASHBOARD_FILTERS: &str = "/api/dashboard/filters";
    pub const AUTH_SIGNUP: &str = "/api/auth/signup";
    pub const AUTH_LOGIN: &str = "/api/auth/login";
    pub const AUTH_LOGOUT: &str = "/api/auth/logout";
    pub const AUTH_ME: &str = "/api/auth/me";
}

pub(crate) fn build_router() -> (Router<AppState>, Vec<String>, Vec<Value>) {
    let mut builder = RouterBuilder::new();
    builder
        .route_get(paths::HEALTHZ, api::meta::healthz, Some(Stability::Stable))
        .route_get(paths::ABOUT, api::meta::about, Some(Stability::Stable))
        .route_get(paths::SPEC_OPENAPI, api::meta::openapi_json, Some(Stability::Beta))
        .route_get(
            paths::DASHBOARD,
            api::dashboard::dashboard_query,
            Some(Stability::Stable),
        )
        .route_get(
            paths::DASHBOARD_FILTERS,
            api::dashboard::dashboard_filters,
            Some(Stability::Stable),
        )
        .route_post(paths::AUTH_SIGNUP, api::auth::signup, Some(Stability::Stable))
        .route_post(paths::AUTH_LOGIN, api::auth::login, Some(Stability::Stable))
        .route_post(paths::AUTH_LOGOUT, api::auth::logout, Some(Stability::Stable))
        .route_get(paths::AUTH_ME, api::auth::me, Some(Stability::Beta));
    builder.build()
}
