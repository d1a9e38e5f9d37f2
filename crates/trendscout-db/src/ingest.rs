//! History-aware save path: enrich scraped rows and upsert them against
//! the recency window.

use chrono::Utc;
use serde::Serialize;
use trendscout_core::{enrich_trend, NewTrend, ScrapedTrend};

use crate::trends::TrendStore;

/// Re-observations of a `(title, geo)` pair inside this many hours update
/// the earlier record instead of adding a new one.
pub const DEFAULT_DEDUP_WINDOW_HOURS: u32 = 2;

/// One trend that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveError {
    pub trend: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSummary {
    /// Inserted plus updated.
    pub saved: usize,
    pub inserted: usize,
    pub updated: usize,
    pub errors: usize,
    pub error_details: Vec<SaveError>,
}

/// Upserts each trend independently.
///
/// A trend with the same title and geo scraped within `dedup_window_hours`
/// is overwritten in place; anything else is inserted. Failures are
/// collected per trend and never abort the batch.
///
/// The lookup and the write are separate store calls, so concurrent saves
/// for the same geo can both insert.
pub async fn save_trends(
    store: &dyn TrendStore,
    trends: &[NewTrend],
    dedup_window_hours: u32,
) -> SaveSummary {
    let mut summary = SaveSummary::default();
    let since = crate::query::hours_before(Utc::now(), dedup_window_hours);

    for trend in trends {
        let result = match store.find_recent(&trend.title, &trend.geo, since).await {
            Ok(existing) => {
                let existing_id = existing.map(|r| r.id);
                store
                    .upsert(existing_id, trend)
                    .await
                    .map(|_| existing_id.is_some())
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(true) => summary.updated += 1,
            Ok(false) => summary.inserted += 1,
            Err(e) => {
                tracing::warn!(title = %trend.title, geo = %trend.geo, error = %e, "failed to save trend");
                summary.error_details.push(SaveError {
                    trend: trend.title.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    summary.saved = summary.inserted + summary.updated;
    summary.errors = summary.error_details.len();
    tracing::info!(
        saved = summary.saved,
        inserted = summary.inserted,
        updated = summary.updated,
        errors = summary.errors,
        "trend batch saved"
    );
    summary
}

/// Enriches one scrape's rows and saves them.
pub async fn ingest_scraped(
    store: &dyn TrendStore,
    trends: &[ScrapedTrend],
    time_window_hours: u32,
    metadata: &serde_json::Value,
    dedup_window_hours: u32,
) -> SaveSummary {
    let enriched: Vec<NewTrend> = trends
        .iter()
        .map(|t| enrich_trend(t, time_window_hours, metadata.clone()))
        .collect();
    save_trends(store, &enriched, dedup_window_hours).await
}

/// Outcome of the scrape-then-save update flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    pub success: bool,
    pub message: String,
    pub total_found: usize,
    pub saved: usize,
    pub errors: usize,
    pub error_details: Vec<SaveError>,
}

impl UpdateSummary {
    /// The scrape itself failed; nothing was written.
    #[must_use]
    pub fn scrape_failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            total_found: 0,
            saved: 0,
            errors: 1,
            error_details: Vec::new(),
        }
    }

    #[must_use]
    pub fn completed(geo: &str, total_found: usize, save: SaveSummary) -> Self {
        Self {
            success: true,
            message: format!("Google Trends update completed for {geo}"),
            total_found,
            saved: save.saved,
            errors: save.errors,
            error_details: save.error_details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};

    use crate::memory::MemoryTrendStore;
    use crate::trends::{CategoryStats, TrendFilter, TrendRecord, TrendSort};
    use crate::DbError;

    fn scraped(rank: u32, title: &str, geo: &str) -> ScrapedTrend {
        ScrapedTrend {
            rank,
            title: title.to_owned(),
            country: geo.to_owned(),
            time_range: "24h".to_owned(),
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn same_title_and_geo_within_window_updates_in_place() {
        let store = MemoryTrendStore::new();
        let meta = serde_json::json!({});

        let first = ingest_scraped(&store, &[scraped(3, "Cup final", "IN")], 24, &meta, 2).await;
        assert_eq!(first.inserted, 1);

        let second = ingest_scraped(&store, &[scraped(1, "Cup final", "IN")], 24, &meta, 2).await;
        assert_eq!(second.updated, 1);
        assert_eq!(second.inserted, 0);

        let rows = store.all().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].trending_score, 98);
    }

    #[tokio::test]
    async fn different_geo_or_stale_record_inserts() {
        let store = MemoryTrendStore::new();
        let meta = serde_json::json!({});
        ingest_scraped(&store, &[scraped(1, "Cup final", "IN")], 24, &meta, 2).await;
        ingest_scraped(&store, &[scraped(1, "Cup final", "US")], 24, &meta, 2).await;
        assert_eq!(store.len().await, 2);

        let mut stale = TrendRecord::from_new(
            100,
            &enrich_trend(&scraped(1, "Old news", "IN"), 24, meta.clone()),
            Utc::now(),
        );
        stale.scraped_at = Utc::now() - Duration::hours(3);
        store.insert_record(stale).await;

        let summary = ingest_scraped(&store, &[scraped(1, "Old news", "IN")], 24, &meta, 2).await;
        assert_eq!(summary.inserted, 1);
        assert_eq!(store.len().await, 4);
    }

    #[tokio::test]
    async fn unbounded_dedup_window_still_matches_recent_trends() {
        let store = MemoryTrendStore::new();
        let meta = serde_json::json!({});
        ingest_scraped(&store, &[scraped(2, "Cup final", "IN")], 24, &meta, u32::MAX).await;

        let again =
            ingest_scraped(&store, &[scraped(1, "Cup final", "IN")], 24, &meta, u32::MAX).await;
        assert_eq!(again.updated, 1);
        assert_eq!(store.len().await, 1);
    }

    /// Store that rejects one title and delegates everything else.
    struct FlakyStore {
        inner: MemoryTrendStore,
        reject: &'static str,
    }

    #[async_trait]
    impl TrendStore for FlakyStore {
        async fn find_recent(
            &self,
            title: &str,
            geo: &str,
            scraped_after: DateTime<Utc>,
        ) -> Result<Option<TrendRecord>, DbError> {
            self.inner.find_recent(title, geo, scraped_after).await
        }

        async fn upsert(
            &self,
            existing_id: Option<i64>,
            trend: &NewTrend,
        ) -> Result<TrendRecord, DbError> {
            if trend.title == self.reject {
                return Err(DbError::Store("constraint violated".to_owned()));
            }
            self.inner.upsert(existing_id, trend).await
        }

        async fn find_many(
            &self,
            filter: &TrendFilter,
            sort: TrendSort,
            skip: u64,
            limit: u64,
        ) -> Result<Vec<TrendRecord>, DbError> {
            self.inner.find_many(filter, sort, skip, limit).await
        }

        async fn count(&self, filter: &TrendFilter) -> Result<u64, DbError> {
            self.inner.count(filter).await
        }

        async fn aggregate_by_category(
            &self,
            filter: &TrendFilter,
        ) -> Result<Vec<CategoryStats>, DbError> {
            self.inner.aggregate_by_category(filter).await
        }

        async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
            self.inner.delete_older_than(cutoff).await
        }

        async fn ping(&self) -> Result<(), DbError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn per_record_failures_do_not_abort_the_batch() {
        let store = FlakyStore {
            inner: MemoryTrendStore::new(),
            reject: "Bad row",
        };
        let batch = [
            scraped(1, "Good one", "IN"),
            scraped(2, "Bad row", "IN"),
            scraped(3, "Good two", "IN"),
        ];
        let summary = ingest_scraped(&store, &batch, 24, &serde_json::json!({}), 2).await;

        assert_eq!(summary.saved, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.error_details[0].trend, "Bad row");
        assert!(summary.error_details[0].error.contains("constraint violated"));
        assert_eq!(store.inner.len().await, 2);
    }

    #[test]
    fn update_summary_shapes() {
        let failed = UpdateSummary::scrape_failed("boom");
        assert!(!failed.success);
        assert_eq!(failed.errors, 1);
        assert_eq!(failed.total_found, 0);

        let done = UpdateSummary::completed(
            "IN",
            5,
            SaveSummary {
                saved: 4,
                inserted: 3,
                updated: 1,
                errors: 1,
                error_details: vec![SaveError {
                    trend: "x".to_owned(),
                    error: "y".to_owned(),
                }],
            },
        );
        assert!(done.success);
        assert_eq!(done.message, "Google Trends update completed for IN");
        assert_eq!(done.saved, 4);
        let json = serde_json::to_value(&done).unwrap();
        assert_eq!(json["totalFound"], 5);
        assert_eq!(json["errorDetails"][0]["trend"], "x");
    }
}
