//! Commands over stored trends. Everything here needs `DATABASE_URL`.

use clap::Args;
use trendscout_core::{resolve_region_code, AppConfig, TimeWindow};
use trendscout_db::{
    clean_old_trends, ingest_scraped, list_trends, trend_stats, ListOptions, PgTrendStore,
    SortOrder, TrendSort, TrendSortField, UpdateSummary,
};
use trendscout_scraper::{ScrapeRequest, MAX_LIMIT};

use crate::scrape::build_scraper;

#[derive(Debug, Args)]
pub(crate) struct ListArgs {
    #[arg(long, default_value = "IN")]
    pub geo: String,
    #[arg(long)]
    pub category: Option<String>,
    /// Stored window tag, e.g. 24h
    #[arg(long)]
    pub time_range: Option<String>,
    #[arg(long, default_value_t = 24)]
    pub hours_ago: u32,
    /// rank, trendingScore or scrapedAt
    #[arg(long, default_value = "rank")]
    pub sort_by: String,
    /// asc or desc
    #[arg(long, default_value = "asc")]
    pub sort_order: String,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 50)]
    pub limit: u32,
}

impl ListArgs {
    pub(crate) fn to_options(&self) -> anyhow::Result<ListOptions> {
        let field: TrendSortField = self.sort_by.parse().map_err(anyhow::Error::msg)?;
        let order: SortOrder = self.sort_order.parse().map_err(anyhow::Error::msg)?;
        Ok(ListOptions {
            geo: resolve_region_code(&self.geo)?,
            category: self.category.clone(),
            time_range: self.time_range.clone(),
            hours_ago: self.hours_ago,
            sort: TrendSort { field, order },
            page: self.page.max(1),
            limit: self.limit.max(1),
        })
    }
}

async fn open_store(config: &AppConfig) -> anyhow::Result<PgTrendStore> {
    let pool = trendscout_db::connect_pool_from_config(config).await?;
    Ok(PgTrendStore::new(pool))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Scrapes `geo` and saves the trends against recent history.
///
/// # Errors
///
/// Returns an error for invalid input, a missing database, or a failed
/// scrape (after printing its summary).
pub(crate) async fn run_update(config: &AppConfig, geo: &str, hours: &str) -> anyhow::Result<()> {
    let request = ScrapeRequest {
        geo: resolve_region_code(geo)?,
        window: TimeWindow::parse(hours)?,
        limit: MAX_LIMIT,
    };
    let store = open_store(config).await?;
    let scraper = build_scraper(config, None).await?;

    let scraped = scraper.scrape(&request).await;
    scraper.session().shutdown().await;

    let summary = match scraped {
        Ok(result) => {
            let metadata = scraper.provenance(&result);
            let save = ingest_scraped(
                &store,
                &result.trends,
                request.window.hours(),
                &metadata,
                config.dedup_window_hours,
            )
            .await;
            UpdateSummary::completed(&request.geo, result.total_trends, save)
        }
        Err(e) => {
            tracing::error!(geo = %request.geo, error = %e, "cli: update scrape failed");
            UpdateSummary::scrape_failed(e.to_string())
        }
    };

    print_json(&summary)?;
    if !summary.success {
        anyhow::bail!("update failed for {}", request.geo);
    }
    Ok(())
}

pub(crate) async fn run_list(config: &AppConfig, args: &ListArgs) -> anyhow::Result<()> {
    let options = args.to_options()?;
    let store = open_store(config).await?;
    print_json(&list_trends(&store, &options).await?)
}

pub(crate) async fn run_stats(config: &AppConfig, geo: &str) -> anyhow::Result<()> {
    let geo = resolve_region_code(geo)?;
    let store = open_store(config).await?;
    print_json(&trend_stats(&store, &geo).await?)
}

pub(crate) async fn run_cleanup(config: &AppConfig, days_to_keep: u32) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let deleted = clean_old_trends(&store, days_to_keep).await?;
    tracing::info!(deleted, days_to_keep, "cli: retention cleanup complete");
    println!("deleted {deleted} trends older than {days_to_keep} days");
    Ok(())
}

pub(crate) async fn run_db_ping(config: &AppConfig) -> anyhow::Result<()> {
    let pool = trendscout_db::connect_pool_from_config(config).await?;
    trendscout_db::ping(&pool).await?;
    println!("database ok");
    Ok(())
}

pub(crate) async fn run_db_migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = trendscout_db::connect_pool_from_config(config).await?;
    let applied = trendscout_db::run_migrations(&pool).await?;
    println!("applied {applied} migrations");
    Ok(())
}
