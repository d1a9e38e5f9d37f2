//! Routes over stored trends: list, stats, update and cleanup.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use trendscout_core::{resolve_region_code, TimeWindow};
use trendscout_db::{
    clean_old_trends, list_trends, trend_stats, ListOptions, SortOrder, TrendPage, TrendSort,
    TrendSortField, TrendStats, UpdateSummary, DEFAULT_LIST_GEO,
};
use trendscout_scraper::{ScrapeRequest, MAX_LIMIT};

use crate::middleware::RequestId;
use crate::update::run_update;

use super::{map_db_error, validation_error, ApiError, ApiResponse, AppState, ResponseMeta};

const MAX_PAGE_SIZE: u32 = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListQuery {
    pub geo: Option<String>,
    pub category: Option<String>,
    pub time_range: Option<String>,
    pub hours_ago: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GeoQuery {
    pub geo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateQuery {
    pub geo: Option<String>,
    pub hours: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CleanupQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CleanupData {
    deleted_count: u64,
    days_to_keep: u32,
}

fn geo_or_default(req_id: &RequestId, geo: Option<&str>) -> Result<String, ApiError> {
    resolve_region_code(geo.unwrap_or(DEFAULT_LIST_GEO)).map_err(|e| validation_error(req_id, &e))
}

fn list_options(req_id: &RequestId, query: ListQuery) -> Result<ListOptions, ApiError> {
    let invalid = |message: String| ApiError::new(req_id.0.clone(), "validation_error", message);
    let defaults = ListOptions::default();

    let field = query
        .sort_by
        .as_deref()
        .map(str::parse::<TrendSortField>)
        .transpose()
        .map_err(invalid)?
        .unwrap_or_default();
    let order = query
        .sort_order
        .as_deref()
        .map(str::parse::<SortOrder>)
        .transpose()
        .map_err(invalid)?
        .unwrap_or_default();

    Ok(ListOptions {
        geo: geo_or_default(req_id, query.geo.as_deref())?,
        category: query.category,
        time_range: query.time_range,
        hours_ago: query.hours_ago.unwrap_or(defaults.hours_ago),
        sort: TrendSort { field, order },
        page: query.page.unwrap_or(1).max(1),
        limit: query
            .limit
            .unwrap_or(defaults.limit)
            .clamp(1, MAX_PAGE_SIZE),
    })
}

pub(super) async fn list(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<TrendPage>>, ApiError> {
    let options = list_options(&req_id, query)?;
    let page = list_trends(state.store.as_ref(), &options)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: page,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<GeoQuery>,
) -> Result<Json<ApiResponse<TrendStats>>, ApiError> {
    let geo = geo_or_default(&req_id, query.geo.as_deref())?;
    let stats = trend_stats(state.store.as_ref(), &geo)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: stats,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Scrapes and stores one region. A failed scrape answers 502 with the
/// summary still in the body.
pub(super) async fn update(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<UpdateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let geo = geo_or_default(&req_id, query.geo.as_deref())?;
    let window = TimeWindow::parse(query.hours.as_deref().unwrap_or("24"))
        .map_err(|e| validation_error(&req_id, &e))?;
    let request = ScrapeRequest {
        geo,
        window,
        limit: MAX_LIMIT,
    };

    let summary: UpdateSummary = run_update(
        &state.scraper,
        state.store.as_ref(),
        &request,
        state.dedup_window_hours,
    )
    .await;
    let status = if summary.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };

    Ok((
        status,
        Json(ApiResponse {
            data: summary,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn cleanup(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CleanupQuery>,
) -> Result<Json<ApiResponse<CleanupData>>, ApiError> {
    let days_to_keep = query.days.unwrap_or(state.retention_days);
    let deleted_count = clean_old_trends(state.store.as_ref(), days_to_keep)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: CleanupData {
            deleted_count,
            days_to_keep,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
