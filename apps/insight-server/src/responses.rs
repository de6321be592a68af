use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use insight_protocol::ProblemDetails;
use insight_store::StoreError;
use tracing::warn;

use crate::request_ctx;

pub(crate) const DATA_UNAVAILABLE_DETAIL: &str = "the datastore is unavailable; try again later";

/// RFC 7807 problem response tagged with the current request id.
pub(crate) fn problem(status: StatusCode, title: &str, detail: Option<String>) -> Response {
    let mut body = ProblemDetails::new(status.as_u16(), title);
    if let Some(detail) = detail {
        body = body.with_detail(detail);
    }
    if let Some(ctx) = request_ctx::current() {
        body = body.with_trace_id(ctx.as_str());
    }
    let mut res = (status, Json(body)).into_response();
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/problem+json"),
    );
    res
}

pub(crate) fn bad_request(detail: impl Into<String>) -> Response {
    problem(StatusCode::BAD_REQUEST, "Bad Request", Some(detail.into()))
}

pub(crate) fn unauthorized(detail: impl Into<String>) -> Response {
    problem(StatusCode::UNAUTHORIZED, "Unauthorized", Some(detail.into()))
}

/// Body that could not be read as the expected JSON; keeps axum's status (400, 415 or 422).
pub(crate) fn json_rejection(rejection: JsonRejection) -> Response {
    let status = rejection.status();
    let title = status.canonical_reason().unwrap_or("Bad Request");
    problem(status, title, Some(rejection.body_text()))
}

/// Map a store failure onto the response a client can act on.
///
/// Datastore internals stay in the log; clients get a fixed detail.
pub(crate) fn store_error(err: StoreError) -> Response {
    match err {
        StoreError::Conflict(what) => problem(
            StatusCode::CONFLICT,
            "Conflict",
            Some(format!("{what} already exists")),
        ),
        other => {
            warn!(error = %other, "datastore unavailable");
            problem(
                StatusCode::SERVICE_UNAVAILABLE,
                "Data Unavailable",
                Some(DATA_UNAVAILABLE_DETAIL.to_string()),
            )
        }
    }
}
