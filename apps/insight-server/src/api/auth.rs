use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use insight_protocol::{LoginRequest, SessionGrant, SignupRequest};
use insight_store::UserRow;
use tracing::info;

use crate::{responses, session, AppState};

async fn grant(state: &AppState, user: UserRow, status: StatusCode) -> Response {
    match state
        .store()
        .create_session_async(user.id, state.session_ttl())
        .await
    {
        Ok(session) => (
            status,
            Json(SessionGrant {
                user: user.info(),
                token: session.token,
                expires_at: session.expires,
            }),
        )
            .into_response(),
        Err(err) => responses::store_error(err),
    }
}

/// Register a user and open a session.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "Auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Created", body = SessionGrant),
        (status = 400, description = "Missing fields or malformed body", body = insight_protocol::ProblemDetails),
        (status = 409, description = "Username or email taken", body = insight_protocol::ProblemDetails)
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return responses::json_rejection(rejection),
    };
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();
    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return responses::bad_request("username, email and password are required");
    }
    match state
        .store()
        .create_user_async(username, email, req.password)
        .await
    {
        Ok(user) => {
            info!(user_id = user.id, "user registered");
            grant(&state, user, StatusCode::CREATED).await
        }
        Err(err) => responses::store_error(err),
    }
}

/// Exchange credentials for a session.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = SessionGrant),
        (status = 400, description = "Missing fields or malformed body", body = insight_protocol::ProblemDetails),
        (status = 401, description = "Invalid credentials", body = insight_protocol::ProblemDetails)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return responses::json_rejection(rejection),
    };
    let username = req.username.trim().to_string();
    if username.is_empty() || req.password.is_empty() {
        return responses::bad_request("username and password are required");
    }
    match state
        .store()
        .verify_credentials_async(username, req.password)
        .await
    {
        Ok(Some(user)) => grant(&state, user, StatusCode::OK).await,
        Ok(None) => responses::unauthorized("invalid username or password"),
        Err(err) => responses::store_error(err),
    }
}

/// End the caller's session.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 204, description = "Session closed"),
        (status = 401, description = "No bearer token", body = insight_protocol::ProblemDetails)
    )
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(token) = session::bearer_token(&headers) else {
        return responses::unauthorized("missing bearer token");
    };
    match state.store().delete_session_async(token).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => responses::store_error(err),
    }
}

/// The user behind the presented session.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = insight_protocol::UserInfo),
        (status = 401, description = "No valid session", body = insight_protocol::ProblemDetails)
    )
)]
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match session::session_user(&state, &headers).await {
        Ok(user) => Json(user.info()).into_response(),
        Err(res) => res,
    }
}
