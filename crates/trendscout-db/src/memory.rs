//! In-process [`TrendStore`], used when no database is configured and in
//! tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use trendscout_core::NewTrend;

use crate::trends::{CategoryStats, TrendFilter, TrendRecord, TrendSort, TrendStore};
use crate::DbError;

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    rows: BTreeMap<i64, TrendRecord>,
}

/// Trends kept in a map keyed by id. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTrendStore {
    inner: RwLock<Inner>,
}

impl MemoryTrendStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully formed record, keeping its id. Used to seed fixtures.
    pub async fn insert_record(&self, record: TrendRecord) {
        let mut inner = self.inner.write().await;
        inner.next_id = inner.next_id.max(record.id);
        inner.rows.insert(record.id, record);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.rows.is_empty()
    }

    /// Snapshot of every record in id order.
    pub async fn all(&self) -> Vec<TrendRecord> {
        self.inner.read().await.rows.values().cloned().collect()
    }
}

#[async_trait]
impl TrendStore for MemoryTrendStore {
    async fn find_recent(
        &self,
        title: &str,
        geo: &str,
        scraped_after: DateTime<Utc>,
    ) -> Result<Option<TrendRecord>, DbError> {
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .values()
            .filter(|r| r.title == title && r.geo == geo && r.scraped_at >= scraped_after)
            .max_by(|a, b| a.scraped_at.cmp(&b.scraped_at).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn upsert(
        &self,
        existing_id: Option<i64>,
        trend: &NewTrend,
    ) -> Result<TrendRecord, DbError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        if let Some(id) = existing_id {
            let row = inner.rows.get_mut(&id).ok_or(DbError::NotFound)?;
            row.overwrite(trend, now);
            return Ok(row.clone());
        }

        inner.next_id += 1;
        let record = TrendRecord::from_new(inner.next_id, trend, now);
        inner.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_many(
        &self,
        filter: &TrendFilter,
        sort: TrendSort,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<TrendRecord>, DbError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<TrendRecord> = inner
            .rows
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| sort.compare(a, b));

        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(skip).take(limit).collect())
    }

    async fn count(&self, filter: &TrendFilter) -> Result<u64, DbError> {
        let inner = self.inner.read().await;
        let total = inner.rows.values().filter(|r| filter.matches(r)).count();
        Ok(u64::try_from(total).unwrap_or(u64::MAX))
    }

    async fn aggregate_by_category(
        &self,
        filter: &TrendFilter,
    ) -> Result<Vec<CategoryStats>, DbError> {
        let inner = self.inner.read().await;
        let mut matching: Vec<&TrendRecord> =
            inner.rows.values().filter(|r| filter.matches(r)).collect();
        matching.sort_by(|a, b| a.scraped_at.cmp(&b.scraped_at).then(a.id.cmp(&b.id)));

        // category -> (count, score sum, earliest title)
        let mut groups: BTreeMap<&str, (i64, i64, &str)> = BTreeMap::new();
        for record in matching {
            let entry = groups
                .entry(record.category.as_str())
                .or_insert((0, 0, record.title.as_str()));
            entry.0 += 1;
            entry.1 += i64::from(record.trending_score);
        }

        let mut stats: Vec<CategoryStats> = groups
            .into_iter()
            .map(|(category, (count, sum, top_trend))| {
                #[allow(clippy::cast_precision_loss)]
                let avg_score = sum as f64 / count as f64;
                CategoryStats {
                    category: category.to_owned(),
                    count,
                    avg_score,
                    top_trend: top_trend.to_owned(),
                }
            })
            .collect();
        stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
        Ok(stats)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let mut inner = self.inner.write().await;
        let before = inner.rows.len();
        inner.rows.retain(|_, r| r.scraped_at >= cutoff);
        Ok(u64::try_from(before - inner.rows.len()).unwrap_or(u64::MAX))
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }
}
