//! Scrape-then-save update flow shared by the HTTP route and the scheduler.

use trendscout_db::{ingest_scraped, TrendStore, UpdateSummary};
use trendscout_scraper::{ScrapeRequest, TrendScraper};

/// Scrapes `request`, enriches every row and saves it against recent
/// history. A failed scrape writes nothing.
pub async fn run_update(
    scraper: &TrendScraper,
    store: &dyn TrendStore,
    request: &ScrapeRequest,
    dedup_window_hours: u32,
) -> UpdateSummary {
    let result = match scraper.scrape(request).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(geo = %request.geo, error = %e, "update aborted: scrape failed");
            return UpdateSummary::scrape_failed(e.to_string());
        }
    };

    let metadata = scraper.provenance(&result);
    let save = ingest_scraped(
        store,
        &result.trends,
        request.window.hours(),
        &metadata,
        dedup_window_hours,
    )
    .await;

    tracing::info!(
        geo = %request.geo,
        found = result.total_trends,
        saved = save.saved,
        errors = save.errors,
        "update complete"
    );
    UpdateSummary::completed(&request.geo, result.total_trends, save)
}
