pub mod app_config;
pub mod config;
pub mod enrich;
pub mod region;
pub mod trends;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use enrich::{classify, enrich_trend, extract_tags, trending_score};
pub use region::{resolve_region_code, validate_limit, Region, TimeWindow};
pub use trends::{NewTrend, ScrapedTrend, TREND_SOURCE};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Caller-input errors. Surfaced as client errors and never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid country. Supported countries: {supported}")]
    InvalidRegion { supported: String },

    #[error("Invalid time period. Supported: 4h, 24h, 48h, 7d or number of hours")]
    InvalidTimeWindow(String),

    #[error("invalid limit {0}: must be a positive integer")]
    InvalidLimit(i64),

    #[error("region code must be non-empty")]
    EmptyRegionCode,
}
