use axum::body::Body;
use axum::http::{header, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use insight_store::UserRow;

use crate::router::paths;
use crate::{responses, AppState};

/// Token from `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the caller's session, or the response to send instead.
pub(crate) async fn session_user(state: &AppState, headers: &HeaderMap) -> Result<UserRow, Response> {
    let Some(token) = bearer_token(headers) else {
        return Err(responses::unauthorized("missing bearer token"));
    };
    match state.store().session_user_async(token).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(responses::unauthorized("session expired or unknown")),
        Err(err) => Err(responses::store_error(err)),
    }
}

/// Gate dashboard routes behind a session when the server is configured to.
pub(crate) async fn require_session_mw(state: AppState, req: Request<Body>, next: Next) -> Response {
    if !state.require_session() || !req.uri().path().starts_with(paths::DASHBOARD) {
        return next.run(req).await;
    }
    let outcome = session_user(&state, req.headers()).await;
    match outcome {
        Ok(_) => next.run(req).await,
        Err(res) => res,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok-1 "));
        assert_eq!(bearer_token(&headers), Some("tok-1"));
    }
}
