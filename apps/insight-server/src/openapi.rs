use utoipa::{OpenApi, ToSchema};

#[allow(dead_code)]
#[derive(ToSchema)]
pub struct HealthOk {
    pub ok: bool,
}

#[allow(dead_code)]
#[derive(ToSchema)]
pub struct AboutCounts {
    pub total: usize,
}

#[allow(dead_code)]
#[derive(ToSchema)]
pub struct AboutResponse {
    pub service: String,
    pub version: String,
    pub require_session: bool,
    pub counts: AboutCounts,
    #[schema(example = json!(["GET /healthz", "GET /api/dashboard"]))]
    pub endpoints: Vec<String>,
    #[schema(value_type = Vec<serde_json::Value>)]
    pub endpoints_meta: Vec<serde_json::Value>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::meta::healthz,
        crate::api::meta::about,
        crate::api::meta::openapi_json,
        crate::api::dashboard::dashboard_query,
        crate::api::dashboard::dashboard_filters,
        crate::api::auth::signup,
        crate::api::auth::login,
        crate::api::auth::logout,
        crate::api::auth::me,
    ),
    components(
        schemas(
            HealthOk,
            AboutCounts,
            AboutResponse,
            insight_protocol::ProblemDetails,
            insight_protocol::FilterField,
            insight_protocol::SignupRequest,
            insight_protocol::LoginRequest,
            insight_protocol::UserInfo,
            insight_protocol::SessionGrant,
        )
    ),
    tags(
        (name = "Meta", description = "Health and service metadata"),
        (name = "Dashboard", description = "Filtered records and filter catalog"),
        (name = "Auth", description = "Users and bearer sessions")
    )
)]
pub struct ApiDoc;
