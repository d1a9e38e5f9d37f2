//! `compare` and `validate`: offline checks over scrapes.

use std::path::{Path, PathBuf};

use clap::Args;
use trendscout_core::{AppConfig, TimeWindow};
use trendscout_scraper::{ScrapeOutcome, ScrapeRequest, ScrapeResult, TrendScraper};

use crate::format::{compare_trends, validate_payload};
use crate::scrape::build_scraper;

#[derive(Debug, Args)]
pub(crate) struct CompareArgs {
    pub country1: String,
    pub window1: String,
    pub country2: String,
    pub window2: String,
    #[arg(long, default_value_t = 25)]
    pub limit: i64,
    /// Extract both sides from a saved HTML page instead of launching a browser
    #[arg(long)]
    pub page_file: Option<PathBuf>,
}

async fn scrape_one(
    scraper: &TrendScraper,
    country: &str,
    window: &str,
    limit: i64,
) -> anyhow::Result<ScrapeResult> {
    let request = ScrapeRequest::new(country, TimeWindow::parse(window)?, limit)?;
    match scraper.fetch_trends(&request).await {
        ScrapeOutcome::Success(result) => Ok(result),
        ScrapeOutcome::Failure(failure) => {
            anyhow::bail!("scrape of {} failed: {}", request.geo, failure.error)
        }
    }
}

/// Scrapes both regions one after the other on a shared browser session and
/// prints the title overlap.
///
/// # Errors
///
/// Returns an error for invalid arguments or if either scrape fails.
pub(crate) async fn run_compare(config: &AppConfig, args: &CompareArgs) -> anyhow::Result<()> {
    let scraper = build_scraper(config, args.page_file.as_ref()).await?;
    tracing::info!(
        first = %args.country1,
        second = %args.country2,
        "cli: comparing trends"
    );

    let scraped = async {
        let first = scrape_one(&scraper, &args.country1, &args.window1, args.limit).await?;
        let second = scrape_one(&scraper, &args.country2, &args.window2, args.limit).await?;
        anyhow::Ok((first, second))
    }
    .await;
    scraper.session().shutdown().await;

    let (first, second) = scraped?;
    let comparison = compare_trends(&first, &second);
    println!("{}", serde_json::to_string_pretty(&comparison)?);
    Ok(())
}

/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the payload
/// is invalid. Problems are printed before returning.
pub(crate) async fn run_validate(path: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let payload: serde_json::Value = serde_json::from_str(&raw)?;

    let validation = validate_payload(&payload);
    println!("{}", serde_json::to_string_pretty(&validation)?);
    if !validation.valid {
        anyhow::bail!("{} problem(s) in {}", validation.errors.len(), path.display());
    }
    Ok(())
}
