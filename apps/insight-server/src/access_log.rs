use std::time::Instant;

use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::request_ctx::RequestId;

/// One `http.access` event per request.
pub(crate) async fn access_log_mw(req: Request<axum::body::Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let request_id = req.extensions().get::<RequestId>().cloned();
    let res = next.run(req).await;
    let dur_ms = started.elapsed().as_millis() as u64;
    let status = res.status().as_u16();
    let (request_id, id_generated) = request_id
        .map(|id| (id.as_str().to_string(), id.generated()))
        .unwrap_or_default();
    tracing::info!(
        target: "http.access",
        method = %method,
        path = %path,
        status,
        dur_ms,
        request_id = %request_id,
        id_generated,
        "request served"
    );
    res
}
