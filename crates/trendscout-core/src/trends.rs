//! Trend shapes that cross crate boundaries: what the extractor hands back
//! and what the enricher hands to storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance tag stamped on every stored trend.
pub const TREND_SOURCE: &str = "google-trends";

/// One ranked row as it came off the page, before enrichment.
///
/// Serialized in camelCase because it is part of the public scrape payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedTrend {
    /// 1-based position in extraction order.
    pub rank: u32,
    pub title: String,
    /// Region code the scrape targeted (e.g. `"IN"`).
    pub country: String,
    /// Window tag, e.g. `"24h"`.
    pub time_range: String,
    pub scraped_at: DateTime<Utc>,
}

/// A fully enriched trend ready to be inserted, or to overwrite an existing
/// occurrence of the same `(title, geo)` inside the recency window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTrend {
    pub title: String,
    pub rank: i32,
    pub geo: String,
    pub time_range: String,
    pub time_window_hours: i32,
    pub scraped_at: DateTime<Utc>,
    pub category: String,
    pub tags: Vec<String>,
    pub trending_score: i32,
    pub source: String,
    pub is_active: bool,
    /// Scrape provenance: duration, page URL.
    pub metadata: serde_json::Value,
}
