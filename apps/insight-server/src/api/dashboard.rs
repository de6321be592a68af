use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use insight_protocol::SelectedFilters;
use tracing::debug;

use crate::{responses, AppState};

/// Records matching every supplied filter exactly.
///
/// Unknown parameters and empty values are ignored; no parameters returns the
/// whole collection in insertion order.
#[utoipa::path(
    get,
    path = "/api/dashboard",
    tag = "Dashboard",
    params(
        ("end_year" = Option<String>, Query, description = "Exact end year"),
        ("topic" = Option<String>, Query, description = "Exact topic"),
        ("sector" = Option<String>, Query, description = "Exact sector"),
        ("region" = Option<String>, Query, description = "Exact region"),
        ("pestle" = Option<String>, Query, description = "Exact PESTLE category"),
        ("source" = Option<String>, Query, description = "Exact source"),
        ("swot" = Option<String>, Query, description = "Exact SWOT category"),
        ("country" = Option<String>, Query, description = "Exact country"),
        ("city" = Option<String>, Query, description = "Exact city"),
    ),
    responses(
        (status = 200, description = "Matching records", body = [serde_json::Value]),
        (status = 503, description = "Datastore unavailable", body = insight_protocol::ProblemDetails)
    )
)]
pub async fn dashboard_query(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let filters = SelectedFilters::from_query_pairs(pairs);
    match state.store().query_records_async(filters.clone()).await {
        Ok(records) => {
            debug!(filters = filters.len(), matched = records.len(), "dashboard query");
            Json(records).into_response()
        }
        Err(err) => responses::store_error(err),
    }
}

/// Distinct non-empty values for each catalog field.
#[utoipa::path(
    get,
    path = "/api/dashboard/filters",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Field to sorted distinct values", body = serde_json::Value),
        (status = 503, description = "Datastore unavailable", body = insight_protocol::ProblemDetails)
    )
)]
pub async fn dashboard_filters(State(state): State<AppState>) -> Response {
    match state.store().filter_catalog_async().await {
        Ok(catalog) => Json(catalog).into_response(),
        Err(err) => responses::store_error(err),
    }
}
