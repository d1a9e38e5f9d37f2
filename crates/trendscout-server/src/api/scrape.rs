//! Live scrape routes: one fixed route per region and window, plus the
//! generic `/api/trends/{country}/{window}`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use trendscout_core::{Region, TimeWindow};
use trendscout_scraper::{ScrapeRequest, DEFAULT_LIMIT, MAX_LIMIT};

use crate::middleware::RequestId;

use super::{validation_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct LimitQuery {
    pub limit: Option<String>,
}

/// Runs one scrape. A failed scrape is still a well-formed body with
/// `success: false`, sent as 502.
async fn scrape_response(state: &AppState, req_id: RequestId, request: ScrapeRequest) -> Response {
    let outcome = state.scraper.fetch_trends(&request).await;
    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    (
        status,
        Json(ApiResponse {
            data: outcome,
            meta: ResponseMeta::new(req_id.0),
        }),
    )
        .into_response()
}

/// `GET /api/trends/{region}/{window}` for every named region and fixed
/// window, always at the default limit.
pub(super) fn fixed_routes() -> Router<AppState> {
    let mut router = Router::new();
    for region in Region::ALL {
        for window in TimeWindow::FIXED {
            let path = format!("/api/trends/{}/{}", region.slug(), window.token());
            router = router.route(
                &path,
                get(
                    move |State(state): State<AppState>,
                          Extension(req_id): Extension<RequestId>| async move {
                        scrape_response(&state, req_id, ScrapeRequest::for_region(region, window))
                            .await
                    },
                ),
            );
        }
    }
    router
}

pub(super) async fn generic_trends(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((country, window)): Path<(String, String)>,
    Query(query): Query<LimitQuery>,
) -> Result<Response, ApiError> {
    let region = Region::from_slug(&country).map_err(|e| validation_error(&req_id, &e))?;
    let window = TimeWindow::parse(&window).map_err(|e| validation_error(&req_id, &e))?;
    let limit = parse_limit(query.limit.as_deref())
        .map_err(|message| ApiError::new(req_id.0.clone(), "validation_error", message))?;

    let request = ScrapeRequest {
        geo: region.code().to_owned(),
        window,
        limit,
    };
    Ok(scrape_response(&state, req_id, request).await)
}

/// Missing or blank means [`DEFAULT_LIMIT`]; anything else must be an
/// integer in `1..=MAX_LIMIT`.
fn parse_limit(raw: Option<&str>) -> Result<usize, String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_LIMIT);
    };
    raw.parse::<usize>()
        .ok()
        .filter(|limit| (1..=MAX_LIMIT).contains(limit))
        .ok_or_else(|| format!("Invalid limit. Must be an integer between 1 and {MAX_LIMIT}"))
}
