//! Background job scheduler.
//!
//! When scheduling is enabled, registers a recurring update job that scrapes
//! each configured region over the last 24 hours, and a retention job that
//! deletes old trends.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use trendscout_core::{AppConfig, TimeWindow};
use trendscout_db::{clean_old_trends, TrendStore};
use trendscout_scraper::{ScrapeRequest, TrendScraper, MAX_LIMIT};

use crate::update::run_update;

const SCHEDULED_WINDOW_HOURS: u32 = 24;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    scraper: Arc<TrendScraper>,
    store: Arc<dyn TrendStore>,
    config: &AppConfig,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_update_job(
        &scheduler,
        &config.update_cron,
        scraper,
        Arc::clone(&store),
        Arc::new(config.schedule_regions.clone()),
        config.dedup_window_hours,
    )
    .await?;
    register_cleanup_job(&scheduler, &config.cleanup_cron, store, config.retention_days).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_update_job(
    scheduler: &JobScheduler,
    cron: &str,
    scraper: Arc<TrendScraper>,
    store: Arc<dyn TrendStore>,
    regions: Arc<Vec<String>>,
    dedup_window_hours: u32,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let scraper = Arc::clone(&scraper);
        let store = Arc::clone(&store);
        let regions = Arc::clone(&regions);

        Box::pin(async move {
            tracing::info!(regions = regions.len(), "scheduler: starting trends update");
            run_scheduled_updates(&scraper, store.as_ref(), &regions, dedup_window_hours).await;
            tracing::info!("scheduler: trends update complete");
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: registered trends update job");
    Ok(())
}

/// Updates each region in turn so only one scrape drives the browser at a
/// time.
async fn run_scheduled_updates(
    scraper: &TrendScraper,
    store: &dyn TrendStore,
    regions: &[String],
    dedup_window_hours: u32,
) {
    let window = match TimeWindow::from_hours(SCHEDULED_WINDOW_HOURS) {
        Ok(window) => window,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: invalid window");
            return;
        }
    };

    for geo in regions {
        let request = ScrapeRequest {
            geo: geo.clone(),
            window,
            limit: MAX_LIMIT,
        };
        let summary = run_update(scraper, store, &request, dedup_window_hours).await;
        if summary.success {
            tracing::info!(
                geo = %geo,
                found = summary.total_found,
                saved = summary.saved,
                errors = summary.errors,
                "scheduler: region updated"
            );
        } else {
            tracing::warn!(geo = %geo, message = %summary.message, "scheduler: region update failed");
        }
    }
}

async fn register_cleanup_job(
    scheduler: &JobScheduler,
    cron: &str,
    store: Arc<dyn TrendStore>,
    days_to_keep: u32,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let store = Arc::clone(&store);

        Box::pin(async move {
            match clean_old_trends(store.as_ref(), days_to_keep).await {
                Ok(deleted) => {
                    tracing::info!(deleted, days_to_keep, "scheduler: retention cleanup complete");
                }
                Err(e) => tracing::error!(error = %e, "scheduler: retention cleanup failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: registered retention cleanup job");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trendscout_db::MemoryTrendStore;
    use trendscout_scraper::{BrowserSession, FixtureBackend, ScrapeConfig};

    #[tokio::test]
    async fn scheduled_updates_visit_each_region_in_order() {
        let page = r#"<html><body><table><tbody jsname="cC57zf">
            <tr jsname="a"><td></td><td><div class="mZ3RIc">Monsoon arrives</div></td></tr>
            </tbody></table></body></html>"#;
        let backend = FixtureBackend::new(page);
        let session = Arc::new(BrowserSession::new(Arc::new(backend.clone())));
        let scraper = TrendScraper::new(
            session,
            ScrapeConfig {
                base_url: "https://trends.example.test/trending".to_owned(),
                settle_delay: std::time::Duration::ZERO,
                ..ScrapeConfig::default()
            },
        );
        let store = MemoryTrendStore::new();
        let regions = vec!["IN".to_owned(), "GB".to_owned()];

        run_scheduled_updates(&scraper, &store, &regions, 2).await;

        assert_eq!(
            backend.visited(),
            vec![
                "https://trends.example.test/trending?geo=IN&hours=24".to_owned(),
                "https://trends.example.test/trending?geo=GB&hours=24".to_owned(),
            ]
        );
        let rows = store.all().await;
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.category == "weather"));
    }
}
