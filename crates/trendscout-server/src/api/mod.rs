mod scrape;
mod stored;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use trendscout_core::{CoreError, Region, TimeWindow};
use trendscout_db::TrendStore;
use trendscout_scraper::TrendScraper;

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TrendStore>,
    pub scraper: Arc<TrendScraper>,
    pub dedup_window_hours: u32,
    pub retention_days: u32,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
    browser: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn validation_error(request_id: &RequestId, error: &CoreError) -> ApiError {
    ApiError::new(request_id.0.clone(), "validation_error", error.to_string())
}

pub(super) fn map_db_error(request_id: String, error: &trendscout_db::DbError) -> ApiError {
    tracing::error!(error = %error, "store query failed");
    ApiError::new(request_id, "internal_error", "Internal server error")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("x-request-id"),
        ])
}

fn api_router(rate_limit: RateLimitState) -> Router<AppState> {
    scrape::fixed_routes()
        .route("/api/trends/{country}/{window}", get(scrape::generic_trends))
        .route("/api/google-trends", get(stored::list))
        .route("/api/google-trends/stats", get(stored::stats))
        .route("/api/google-trends/update", post(stored::update))
        .route("/api/google-trends/cleanup", delete(stored::cleanup))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/", get(index))
        .route("/api/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(api_router(rate_limit))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn index(Extension(req_id): Extension<RequestId>) -> impl IntoResponse {
    let mut regions = serde_json::Map::new();
    for region in Region::ALL {
        let windows: serde_json::Map<String, serde_json::Value> = TimeWindow::FIXED
            .iter()
            .map(|w| {
                (
                    w.token(),
                    format!("/api/trends/{}/{}", region.slug(), w.token()).into(),
                )
            })
            .collect();
        regions.insert(region.slug().to_owned(), windows.into());
    }
    regions.insert(
        "generic".to_owned(),
        "/api/trends/{country}/{window}?limit=N".into(),
    );

    Json(ApiResponse {
        data: serde_json::json!({
            "name": "Trendscout API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Scrapes Google Trends for India, the US and the UK",
            "endpoints": {
                "health": "/api/health",
                "trends": regions,
                "stored": {
                    "list": "GET /api/google-trends",
                    "stats": "GET /api/google-trends/stats?geo=",
                    "update": "POST /api/google-trends/update?geo=&hours=",
                    "cleanup": "DELETE /api/google-trends/cleanup?days=",
                },
            },
        }),
        meta: ResponseMeta::new(req_id.0),
    })
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);
    let browser = if state.scraper.session().is_active().await {
        "running"
    } else {
        "idle"
    };

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                    browser,
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                        browser,
                    },
                    meta,
                }),
            )
        }
    }
}

async fn not_found(Extension(req_id): Extension<RequestId>) -> ApiError {
    ApiError::new(req_id.0, "not_found", "Endpoint not found")
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
