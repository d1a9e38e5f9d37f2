//! Stored trends: row type, query shapes and the storage contract.

use std::cmp::Ordering;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use trendscout_core::NewTrend;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `google_trends` table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TrendRecord {
    pub id: i64,
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
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrendRecord {
    /// Builds a record from an enriched trend, as an insert would.
    #[must_use]
    pub fn from_new(id: i64, trend: &NewTrend, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: trend.title.clone(),
            rank: trend.rank,
            geo: trend.geo.clone(),
            time_range: trend.time_range.clone(),
            time_window_hours: trend.time_window_hours,
            scraped_at: trend.scraped_at,
            category: trend.category.clone(),
            tags: trend.tags.clone(),
            trending_score: trend.trending_score,
            source: trend.source.clone(),
            is_active: trend.is_active,
            metadata: trend.metadata.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites every trend field in place, keeping identity and
    /// `created_at`.
    pub fn overwrite(&mut self, trend: &NewTrend, now: DateTime<Utc>) {
        let created_at = self.created_at;
        *self = Self::from_new(self.id, trend, now);
        self.created_at = created_at;
    }
}

/// Per-category aggregate over a filtered set of trends.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub category: String,
    pub count: i64,
    pub avg_score: f64,
    /// Title of the earliest-scraped trend in the category.
    pub top_trend: String,
}

// ---------------------------------------------------------------------------
// Query shapes
// ---------------------------------------------------------------------------

/// Which rows a read or aggregate considers. `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrendFilter {
    pub geo: Option<String>,
    pub category: Option<String>,
    pub time_range: Option<String>,
    pub active_only: bool,
    /// Inclusive lower bound on `scraped_at`.
    pub scraped_after: Option<DateTime<Utc>>,
}

impl TrendFilter {
    #[must_use]
    pub fn matches(&self, record: &TrendRecord) -> bool {
        self.geo.as_ref().is_none_or(|geo| *geo == record.geo)
            && self
                .category
                .as_ref()
                .is_none_or(|category| *category == record.category)
            && self
                .time_range
                .as_ref()
                .is_none_or(|time_range| *time_range == record.time_range)
            && (!self.active_only || record.is_active)
            && self
                .scraped_after
                .is_none_or(|after| record.scraped_at >= after)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrendSortField {
    #[default]
    Rank,
    TrendingScore,
    ScrapedAt,
}

impl FromStr for TrendSortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rank" => Ok(Self::Rank),
            "trendingScore" | "trending_score" | "score" => Ok(Self::TrendingScore),
            "scrapedAt" | "scraped_at" => Ok(Self::ScrapedAt),
            other => Err(format!(
                "unknown sort field '{other}' (expected rank, trendingScore or scrapedAt)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort order '{other}' (expected asc or desc)")),
        }
    }
}

/// Result ordering. Rank sorts break ties by most recent scrape; every sort
/// finally breaks ties by id so pages are stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrendSort {
    pub field: TrendSortField,
    pub order: SortOrder,
}

impl TrendSort {
    fn direction(self) -> &'static str {
        match self.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    /// `ORDER BY` body for this sort. Built only from fixed fragments.
    #[must_use]
    pub fn order_by_sql(self) -> String {
        let dir = self.direction();
        match self.field {
            TrendSortField::Rank => format!("rank {dir}, scraped_at DESC, id ASC"),
            TrendSortField::TrendingScore => format!("trending_score {dir}, id ASC"),
            TrendSortField::ScrapedAt => format!("scraped_at {dir}, id ASC"),
        }
    }

    /// In-memory equivalent of [`TrendSort::order_by_sql`].
    #[must_use]
    pub fn compare(self, a: &TrendRecord, b: &TrendRecord) -> Ordering {
        let directed = |ordering: Ordering| match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        let primary = match self.field {
            TrendSortField::Rank => {
                directed(a.rank.cmp(&b.rank)).then_with(|| b.scraped_at.cmp(&a.scraped_at))
            }
            TrendSortField::TrendingScore => directed(a.trending_score.cmp(&b.trending_score)),
            TrendSortField::ScrapedAt => directed(a.scraped_at.cmp(&b.scraped_at)),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

// ---------------------------------------------------------------------------
// Storage contract
// ---------------------------------------------------------------------------

/// Read/write contract the ingest and query paths are written against.
#[async_trait]
pub trait TrendStore: Send + Sync {
    /// Most recent trend with this `title` and `geo` scraped at or after
    /// `scraped_after`.
    async fn find_recent(
        &self,
        title: &str,
        geo: &str,
        scraped_after: DateTime<Utc>,
    ) -> Result<Option<TrendRecord>, DbError>;

    /// Overwrites the row `existing_id` when given, inserts otherwise.
    ///
    /// Returns [`DbError::NotFound`] if `existing_id` no longer exists.
    async fn upsert(
        &self,
        existing_id: Option<i64>,
        trend: &NewTrend,
    ) -> Result<TrendRecord, DbError>;

    async fn find_many(
        &self,
        filter: &TrendFilter,
        sort: TrendSort,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<TrendRecord>, DbError>;

    async fn count(&self, filter: &TrendFilter) -> Result<u64, DbError>;

    /// Groups matching trends by category, largest group first.
    async fn aggregate_by_category(
        &self,
        filter: &TrendFilter,
    ) -> Result<Vec<CategoryStats>, DbError>;

    /// Hard-deletes trends scraped strictly before `cutoff`.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError>;

    /// Liveness check for health endpoints.
    async fn ping(&self) -> Result<(), DbError>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

const TREND_COLUMNS: &str = "id, title, rank, geo, time_range, time_window_hours, scraped_at, \
                             category, tags, trending_score, source, is_active, metadata, \
                             created_at, updated_at";

const FILTER_SQL: &str = "($1::TEXT IS NULL OR geo = $1) \
                          AND ($2::TEXT IS NULL OR category = $2) \
                          AND ($3::TEXT IS NULL OR time_range = $3) \
                          AND (NOT $4 OR is_active) \
                          AND ($5::timestamptz IS NULL OR scraped_at >= $5)";

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// [`TrendStore`] over the `google_trends` table.
///
/// The find-then-write dedup in ingest is not atomic here: two concurrent
/// updates of the same geo can both miss each other's insert.
#[derive(Debug, Clone)]
pub struct PgTrendStore {
    pool: PgPool,
}

impl PgTrendStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TrendStore for PgTrendStore {
    async fn find_recent(
        &self,
        title: &str,
        geo: &str,
        scraped_after: DateTime<Utc>,
    ) -> Result<Option<TrendRecord>, DbError> {
        let row = sqlx::query_as::<_, TrendRecord>(&format!(
            "SELECT {TREND_COLUMNS} FROM google_trends \
             WHERE title = $1 AND geo = $2 AND scraped_at >= $3 \
             ORDER BY scraped_at DESC, id DESC \
             LIMIT 1"
        ))
        .bind(title)
        .bind(geo)
        .bind(scraped_after)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn upsert(
        &self,
        existing_id: Option<i64>,
        trend: &NewTrend,
    ) -> Result<TrendRecord, DbError> {
        let Some(id) = existing_id else {
            let row = sqlx::query_as::<_, TrendRecord>(&format!(
                "INSERT INTO google_trends \
                   (title, rank, geo, time_range, time_window_hours, scraped_at, category, \
                    tags, trending_score, source, is_active, metadata) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
                 RETURNING {TREND_COLUMNS}"
            ))
            .bind(&trend.title)
            .bind(trend.rank)
            .bind(&trend.geo)
            .bind(&trend.time_range)
            .bind(trend.time_window_hours)
            .bind(trend.scraped_at)
            .bind(&trend.category)
            .bind(&trend.tags)
            .bind(trend.trending_score)
            .bind(&trend.source)
            .bind(trend.is_active)
            .bind(&trend.metadata)
            .fetch_one(&self.pool)
            .await?;
            return Ok(row);
        };

        let row = sqlx::query_as::<_, TrendRecord>(&format!(
            "UPDATE google_trends SET \
               title = $2, rank = $3, geo = $4, time_range = $5, time_window_hours = $6, \
               scraped_at = $7, category = $8, tags = $9, trending_score = $10, \
               source = $11, is_active = $12, metadata = $13, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {TREND_COLUMNS}"
        ))
        .bind(id)
        .bind(&trend.title)
        .bind(trend.rank)
        .bind(&trend.geo)
        .bind(&trend.time_range)
        .bind(trend.time_window_hours)
        .bind(trend.scraped_at)
        .bind(&trend.category)
        .bind(&trend.tags)
        .bind(trend.trending_score)
        .bind(&trend.source)
        .bind(trend.is_active)
        .bind(&trend.metadata)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(DbError::NotFound)
    }

    async fn find_many(
        &self,
        filter: &TrendFilter,
        sort: TrendSort,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<TrendRecord>, DbError> {
        let rows = sqlx::query_as::<_, TrendRecord>(&format!(
            "SELECT {TREND_COLUMNS} FROM google_trends \
             WHERE {FILTER_SQL} \
             ORDER BY {} \
             LIMIT $6 OFFSET $7",
            sort.order_by_sql()
        ))
        .bind(filter.geo.as_deref())
        .bind(filter.category.as_deref())
        .bind(filter.time_range.as_deref())
        .bind(filter.active_only)
        .bind(filter.scraped_after)
        .bind(to_i64(limit))
        .bind(to_i64(skip))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self, filter: &TrendFilter) -> Result<u64, DbError> {
        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM google_trends WHERE {FILTER_SQL}"
        ))
        .bind(filter.geo.as_deref())
        .bind(filter.category.as_deref())
        .bind(filter.time_range.as_deref())
        .bind(filter.active_only)
        .bind(filter.scraped_after)
        .fetch_one(&self.pool)
        .await?;

        Ok(to_u64(total))
    }

    async fn aggregate_by_category(
        &self,
        filter: &TrendFilter,
    ) -> Result<Vec<CategoryStats>, DbError> {
        let rows = sqlx::query_as::<_, CategoryStats>(&format!(
            "SELECT category, \
                    COUNT(*) AS count, \
                    AVG(trending_score)::FLOAT8 AS avg_score, \
                    (ARRAY_AGG(title ORDER BY scraped_at ASC, id ASC))[1] AS top_trend \
             FROM google_trends \
             WHERE {FILTER_SQL} \
             GROUP BY category \
             ORDER BY count DESC, category ASC"
        ))
        .bind(filter.geo.as_deref())
        .bind(filter.category.as_deref())
        .bind(filter.time_range.as_deref())
        .bind(filter.active_only)
        .bind(filter.scraped_after)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM google_trends WHERE scraped_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), DbError> {
        crate::ping(&self.pool).await?;
        Ok(())
    }
}
