use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use insight_protocol::Record;
use insight_store::Store;
use serde_json::{json, Value};
use tempfile::tempdir;
use tower::util::ServiceExt;

use crate::{bootstrap, responses, router, AppState};

fn seed_records() -> Vec<Record> {
    vec![
        Record::new()
            .with("sector", "Energy")
            .with("region", "World")
            .with("end_year", 2020)
            .with("intensity", 6),
        Record::new()
            .with("sector", "Energy")
            .with("region", "Northern America")
            .with("end_year", "")
            .with("intensity", 2),
        Record::new()
            .with("sector", "Healthcare")
            .with("region", "World")
            .with("swot", "Threat"),
    ]
}

fn app_with(dir: &Path, require_session: bool) -> (Router, Store) {
    let store = Store::open(dir).expect("open store");
    store.replace_records(&seed_records()).expect("seed");
    let (routes, endpoints, endpoints_meta) = router::build_router();
    let state = AppState::builder(store.clone())
        .with_endpoints(Arc::new(endpoints))
        .with_endpoints_meta(Arc::new(endpoints_meta))
        .with_require_session(require_session)
        .with_session_ttl(chrono::Duration::hours(1))
        .build();
    let app = bootstrap::attach_global_layers(bootstrap::attach_http_layers(
        bootstrap::attach_stateful_layers(routes, state),
        16,
        &[],
    ));
    (app, store)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.expect("response");
    let status = res.status();
    let bytes = res
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

#[tokio::test]
async fn healthz_echoes_request_id() {
    let dir = tempdir().expect("tempdir");
    let (app, _store) = app_with(dir.path(), false);
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(router::paths::HEALTHZ)
                .header("x-request-id", "probe-1")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("probe-1")
    );
}

#[tokio::test]
async fn dashboard_query_applies_equality_filters() {
    let dir = tempdir().expect("tempdir");
    let (app, _store) = app_with(dir.path(), false);

    let (status, body) = send(&app, get("/api/dashboard")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(3));

    let (status, body) = send(
        &app,
        get("/api/dashboard?sector=Energy&region=&colour=blue"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let (_, body) = send(&app, get("/api/dashboard?sector=Energy&region=World")).await;
    assert_eq!(
        body,
        json!([{"sector": "Energy", "region": "World", "end_year": 2020, "intensity": 6}])
    );

    let (_, body) = send(&app, get("/api/dashboard?end_year=2020")).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (_, body) = send(&app, get("/api/dashboard?swot=Threat")).await;
    assert_eq!(body[0]["sector"], json!("Healthcare"));

    let (_, body) = send(&app, get("/api/dashboard?sector=Retail")).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn filters_endpoint_lists_distinct_values() {
    let dir = tempdir().expect("tempdir");
    let (app, _store) = app_with(dir.path(), false);
    let (status, body) = send(&app, get("/api/dashboard/filters")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sector"], json!(["Energy", "Healthcare"]));
    assert_eq!(body["region"], json!(["Northern America", "World"]));
    assert_eq!(body["end_year"], json!(["2020"]));
    assert_eq!(body["city"], json!([]));
    assert!(body.get("swot").is_none());
}

#[tokio::test]
async fn datastore_failure_is_service_unavailable() {
    let dir = tempdir().expect("tempdir");
    let (app, store) = app_with(dir.path(), false);
    let db = store.db_path().to_path_buf();
    for suffix in ["", "-wal", "-shm"] {
        let path = format!("{}{}", db.display(), suffix);
        let _ = std::fs::remove_file(path);
    }
    std::fs::create_dir(&db).expect("replace db with a directory");

    let (status, body) = send(&app, get("/api/dashboard?sector=Energy")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], json!(503));
    assert_eq!(body["type"], json!("about:blank"));
    assert_eq!(body["message"], json!(responses::DATA_UNAVAILABLE_DETAIL));
    assert_eq!(body["detail"], json!(responses::DATA_UNAVAILABLE_DETAIL));
    let text = body.to_string().to_ascii_lowercase();
    assert!(!text.contains("sqlite"), "{text}");
    assert!(body["trace_id"].as_str().is_some());
}

#[tokio::test]
async fn malformed_auth_bodies_are_problem_responses() {
    let dir = tempdir().expect("tempdir");
    let (app, _store) = app_with(dir.path(), false);

    let cases = [
        (
            router::paths::AUTH_SIGNUP,
            Some("application/json"),
            "{\"username\": ",
            StatusCode::BAD_REQUEST,
        ),
        (
            router::paths::AUTH_LOGIN,
            Some("application/json"),
            "not json",
            StatusCode::BAD_REQUEST,
        ),
        (
            router::paths::AUTH_LOGIN,
            None,
            "{\"username\": \"ada\", \"password\": \"x\"}",
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ),
    ];
    for (path, content_type, body, expected) in cases {
        let mut req = Request::builder().method("POST").uri(path);
        if let Some(content_type) = content_type {
            req = req.header("content-type", content_type);
        }
        let res = app
            .clone()
            .oneshot(req.body(Body::from(body)).expect("request"))
            .await
            .expect("response");
        assert_eq!(res.status(), expected, "{path} {body}");
        assert_eq!(
            res.headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("application/problem+json")
        );
        let bytes = res
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let problem: Value = serde_json::from_slice(&bytes).expect("problem body");
        assert_eq!(problem["status"], json!(expected.as_u16()));
        assert!(problem["detail"].as_str().is_some_and(|d| !d.is_empty()));
    }
}

#[tokio::test]
async fn signup_login_me_logout_round() {
    let dir = tempdir().expect("tempdir");
    let (app, _store) = app_with(dir.path(), false);
    let creds = json!({"username": "ada", "email": "ada@example.com", "password": "analytical"});

    let (status, grant) = send(&app, post_json("/api/auth/signup", creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(grant["user"]["username"], json!("ada"));
    assert_eq!(grant["token"].as_str().map(str::len), Some(64));

    let (status, _) = send(&app, post_json("/api/auth/signup", creds)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        post_json("/api/auth/signup", json!({"username": "grace", "password": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["title"], json!("Bad Request"));

    let (status, _) = send(
        &app,
        post_json("/api/auth/login", json!({"username": "ada", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, login) = send(
        &app,
        post_json(
            "/api/auth/login",
            json!({"username": "ada", "password": "analytical"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = login["token"].as_str().expect("token").to_string();
    assert_ne!(login["token"], grant["token"]);

    let (status, me) = send(&app, get_with_token("/api/auth/me", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], json!("ada@example.com"));

    let logout = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, logout).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get_with_token("/api/auth/me", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn required_sessions_gate_dashboard_routes_only() {
    let dir = tempdir().expect("tempdir");
    let (app, store) = app_with(dir.path(), true);

    let (status, body) = send(&app, get("/api/dashboard")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], json!(401));
    let (status, _) = send(&app, get("/api/dashboard/filters")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);

    let user = store
        .create_user("ada", "ada@example.com", "analytical")
        .expect("user");
    let session = store
        .create_session(user.id, chrono::Duration::hours(1))
        .expect("session");
    let (status, body) = send(&app, get_with_token("/api/dashboard", &session.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn about_and_openapi_describe_the_surface() {
    let dir = tempdir().expect("tempdir");
    let (app, _store) = app_with(dir.path(), false);

    let (status, about) = send(&app, get("/about")).await;
    assert_eq!(status, StatusCode::OK);
    let endpoints: Vec<&str> = about["endpoints"]
        .as_array()
        .expect("endpoints")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(endpoints.contains(&"GET /api/dashboard"));
    assert!(endpoints.contains(&"POST /api/auth/login"));
    assert_eq!(about["require_session"], json!(false));

    let (status, doc) = send(&app, get("/spec/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"].get("/api/dashboard").is_some());
    assert!(doc["paths"].get("/api/dashboard/filters").is_some());
    assert!(doc["paths"].get("/api/auth/signup").is_some());
}
