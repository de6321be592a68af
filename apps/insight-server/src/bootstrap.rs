use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use insight_store::Store;
use tracing::{info, warn};
use utoipa::OpenApi;

use crate::{access_log, app_state::AppState, config::ServerConfig, router::build_router, session};

pub(crate) struct BootstrapOutput {
    pub router: axum::Router<AppState>,
    pub state: AppState,
}

pub(crate) fn build(cfg: &ServerConfig) -> anyhow::Result<BootstrapOutput> {
    let store = Store::open_with_busy_timeout(&cfg.state_dir, cfg.sqlite_busy)
        .with_context(|| format!("opening datastore in {}", cfg.state_dir.display()))?;
    info!(
        db = %store.db_path().display(),
        require_session = cfg.require_session,
        "datastore ready"
    );
    let (router, endpoints, endpoints_meta) = build_router();
    let state = AppState::builder(store)
        .with_endpoints(Arc::new(endpoints))
        .with_endpoints_meta(Arc::new(endpoints_meta))
        .with_require_session(cfg.require_session)
        .with_session_ttl(cfg.session_ttl)
        .build();
    Ok(BootstrapOutput { router, state })
}

pub(crate) fn attach_stateful_layers(
    router: axum::Router<AppState>,
    state: AppState,
) -> axum::Router<()> {
    let router = router.with_state::<()>(state.clone());
    let guard_state = state;
    router.layer(axum::middleware::from_fn(move |req, next| {
        let state = guard_state.clone();
        async move { session::require_session_mw(state, req, next).await }
    }))
}

pub(crate) fn attach_http_layers(
    router: axum::Router<()>,
    concurrency_limit: usize,
    cors_allow_origins: &[String],
) -> axum::Router<()> {
    use tower::limit::ConcurrencyLimitLayer;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    router
        .layer(cors_layer(cors_allow_origins))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(concurrency_limit))
}

pub(crate) fn attach_global_layers(router: axum::Router<()>) -> axum::Router<()> {
    router
        .layer(axum::middleware::from_fn(access_log::access_log_mw))
        .layer(axum::middleware::from_fn(
            crate::request_ctx::correlation_mw,
        ))
}

fn cors_layer(origins: &[String]) -> tower_http::cors::CorsLayer {
    use tower_http::cors::{AllowOrigin, CorsLayer};

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let allow_origin = if parsed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(parsed)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60))
}

/// Write the OpenAPI document to `OPENAPI_OUT` and report the path, if requested.
pub(crate) fn ensure_openapi_export() -> Result<Option<String>, std::io::Error> {
    if let Ok(path) = std::env::var("OPENAPI_OUT") {
        export_openapi(&path)?;
        return Ok(Some(path));
    }
    Ok(None)
}

fn export_openapi(path: &str) -> Result<(), std::io::Error> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let yaml = crate::openapi::ApiDoc::openapi()
        .to_yaml()
        .map_err(std::io::Error::other)?;
    std::fs::write(path, yaml)
}
