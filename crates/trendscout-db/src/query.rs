//! Read side: paginated listing, per-category stats and retention cleanup.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::trends::{CategoryStats, TrendFilter, TrendRecord, TrendSort, TrendStore};
use crate::DbError;

pub const DEFAULT_LIST_GEO: &str = "IN";
pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const DEFAULT_HOURS_AGO: u32 = 24;
pub const DEFAULT_DAYS_TO_KEEP: u32 = 7;
const STATS_WINDOW_HOURS: u32 = 24;

/// `now` minus `span`, clamped to the Unix epoch. Spans too large to
/// represent also clamp, so any `u32` window is safe.
fn clamped_before(now: DateTime<Utc>, span: Option<Duration>) -> DateTime<Utc> {
    span.and_then(|span| now.checked_sub_signed(span))
        .map_or(DateTime::<Utc>::UNIX_EPOCH, |at| at.max(DateTime::<Utc>::UNIX_EPOCH))
}

pub(crate) fn hours_before(now: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
    clamped_before(now, Duration::try_hours(i64::from(hours)))
}

pub(crate) fn days_before(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    clamped_before(now, Duration::try_days(i64::from(days)))
}

/// Filters and paging for [`list_trends`]. Only active trends scraped in
/// the last `hours_ago` hours are eligible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    pub geo: String,
    pub category: Option<String>,
    pub time_range: Option<String>,
    pub hours_ago: u32,
    pub sort: TrendSort,
    /// 1-based.
    pub page: u32,
    pub limit: u32,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            geo: DEFAULT_LIST_GEO.to_owned(),
            category: None,
            time_range: None,
            hours_ago: DEFAULT_HOURS_AGO,
            sort: TrendSort::default(),
            page: 1,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    #[must_use]
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit))
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPage {
    pub trends: Vec<TrendRecord>,
    pub pagination: Pagination,
}

/// Fetches one page of stored trends.
///
/// A `page` of zero is treated as the first page.
///
/// # Errors
///
/// Returns [`DbError`] if the store rejects the read.
pub async fn list_trends(
    store: &dyn TrendStore,
    options: &ListOptions,
) -> Result<TrendPage, DbError> {
    let filter = TrendFilter {
        geo: Some(options.geo.clone()),
        category: options.category.clone(),
        time_range: options.time_range.clone(),
        active_only: true,
        scraped_after: Some(hours_before(Utc::now(), options.hours_ago)),
    };
    let page = options.page.max(1);
    let skip = u64::from(page - 1) * u64::from(options.limit);

    let trends = store
        .find_many(&filter, options.sort, skip, u64::from(options.limit))
        .await?;
    let total = store.count(&filter).await?;

    Ok(TrendPage {
        trends,
        pagination: Pagination::new(page, options.limit, total),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendStats {
    pub geo: String,
    /// Active trends scraped in the last 24 hours.
    pub total: u64,
    pub by_category: Vec<CategoryStats>,
    pub last_updated: DateTime<Utc>,
}

/// Per-category aggregates over the last 24 hours of active trends.
///
/// # Errors
///
/// Returns [`DbError`] if the store rejects the aggregate.
pub async fn trend_stats(store: &dyn TrendStore, geo: &str) -> Result<TrendStats, DbError> {
    let now = Utc::now();
    let filter = TrendFilter {
        geo: Some(geo.to_owned()),
        active_only: true,
        scraped_after: Some(hours_before(now, STATS_WINDOW_HOURS)),
        ..TrendFilter::default()
    };

    let by_category = store.aggregate_by_category(&filter).await?;
    let total = store.count(&filter).await?;

    Ok(TrendStats {
        geo: geo.to_owned(),
        total,
        by_category,
        last_updated: now,
    })
}

/// Hard-deletes trends scraped more than `days_to_keep` days ago. Trends
/// exactly on the cutoff are kept, and a cutoff before the Unix epoch
/// deletes nothing.
///
/// # Errors
///
/// Returns [`DbError`] if the delete fails.
pub async fn clean_old_trends(store: &dyn TrendStore, days_to_keep: u32) -> Result<u64, DbError> {
    let cutoff = days_before(Utc::now(), days_to_keep);
    let deleted = store.delete_older_than(cutoff).await?;
    tracing::info!(days_to_keep, deleted, %cutoff, "old trends cleaned");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(Pagination::new(1, 50, 0).pages, 0);
        assert_eq!(Pagination::new(1, 50, 50).pages, 1);
        assert_eq!(Pagination::new(2, 50, 51).pages, 2);
        assert_eq!(Pagination::new(1, 0, 10).pages, 0);
    }

    #[test]
    fn huge_windows_clamp_to_the_epoch() {
        let now = Utc::now();
        assert_eq!(hours_before(now, u32::MAX), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(days_before(now, u32::MAX), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(hours_before(now, 24), now - Duration::hours(24));
        assert_eq!(days_before(now, 0), now);
    }

    #[test]
    fn list_defaults() {
        let options = ListOptions::default();
        assert_eq!(options.geo, "IN");
        assert_eq!(options.hours_ago, 24);
        assert_eq!(options.page, 1);
        assert_eq!(options.limit, 50);
        assert_eq!(options.sort, TrendSort::default());
    }
}
