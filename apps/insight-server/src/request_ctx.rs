use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tokio::task_local;
use uuid::Uuid;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
const MAX_ID_LEN: usize = 128;

task_local! {
    static REQ_ID: RequestId;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RequestId {
    id: String,
    generated: bool,
}

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub fn generated(&self) -> bool {
        self.generated
    }
}

/// Propagate a sane caller-supplied `x-request-id` or mint one, and echo it back.
pub(crate) async fn correlation_mw(mut req: Request<Body>, next: Next) -> Response {
    let header = HeaderName::from_static(HEADER_REQUEST_ID);
    let request_id = match req
        .headers()
        .get(&header)
        .and_then(|value| value.to_str().ok())
        .and_then(normalize_id)
    {
        Some(id) => RequestId {
            id,
            generated: false,
        },
        None => RequestId {
            id: Uuid::new_v4().to_string(),
            generated: true,
        },
    };
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        req.headers_mut().insert(header.clone(), value);
    }
    req.extensions_mut().insert(request_id.clone());

    REQ_ID
        .scope(request_id.clone(), async move {
            let mut res = next.run(req).await;
            if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
                res.headers_mut().insert(header, value);
            }
            res
        })
        .await
}

pub(crate) fn current() -> Option<RequestId> {
    REQ_ID.try_with(|ctx| ctx.clone()).ok()
}

fn normalize_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut out = String::with_capacity(trimmed.len().min(MAX_ID_LEN));
    for ch in trimmed.chars() {
        if ch.is_control() || ch == '\u{7f}' {
            continue;
        }
        if out.len() >= MAX_ID_LEN {
            break;
        }
        out.push(ch);
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}
