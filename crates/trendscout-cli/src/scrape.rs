//! `scrape`: one live scrape, optionally filtered, summarised or exported.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use trendscout_core::{AppConfig, TimeWindow};
use trendscout_scraper::{
    BrowserBackend, BrowserSession, ChromiumBackend, FixtureBackend, ScrapeConfig, ScrapeOutcome,
    ScrapeRequest, TrendScraper,
};

use crate::format::{export_to_file, filter_by_keywords, render, statistics, OutputFormat};

#[derive(Debug, Args)]
pub(crate) struct ScrapeArgs {
    /// Region name (india, us, uk) or raw region code
    pub country: String,
    /// 4h, 24h, 48h, 7d or a number of hours
    pub window: String,
    #[arg(long, default_value_t = 25)]
    pub limit: i64,
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
    /// Extract from a saved HTML page instead of launching a browser
    #[arg(long)]
    pub page_file: Option<PathBuf>,
    /// Keep only trends whose title contains one of these keywords
    #[arg(long, value_delimiter = ',')]
    pub filter: Vec<String>,
    #[arg(long, requires = "filter")]
    pub case_sensitive: bool,
    /// Print title statistics instead of the trends
    #[arg(long, conflicts_with = "output")]
    pub stats: bool,
    /// Write to this path plus the format's extension instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Builds the scraper for a CLI run. A saved page replaces the browser and
/// skips the render settle delay.
pub(crate) async fn build_scraper(
    config: &AppConfig,
    page_file: Option<&PathBuf>,
) -> anyhow::Result<TrendScraper> {
    let mut scrape_config = ScrapeConfig::from_app_config(config);
    let backend: Arc<dyn BrowserBackend> = match page_file {
        Some(path) => {
            let html = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
            scrape_config.settle_delay = Duration::ZERO;
            Arc::new(FixtureBackend::new(html))
        }
        None => Arc::new(ChromiumBackend::new(config.chrome_path.clone())),
    };
    let session = Arc::new(BrowserSession::new(backend));
    Ok(TrendScraper::new(session, scrape_config))
}

/// # Errors
///
/// Returns an error for invalid arguments or an unreadable page file. A
/// failed scrape prints the structured failure and also returns an error so
/// the exit status is non-zero.
pub(crate) async fn run_scrape(config: &AppConfig, args: &ScrapeArgs) -> anyhow::Result<()> {
    let window = TimeWindow::parse(&args.window)?;
    let request = ScrapeRequest::new(&args.country, window, args.limit)?;
    let scraper = build_scraper(config, args.page_file.as_ref()).await?;
    tracing::info!(
        geo = %request.geo,
        hours = request.window.hours(),
        limit = request.limit,
        offline = args.page_file.is_some(),
        "cli: scraping trends"
    );

    let outcome = scraper.fetch_trends(&request).await;
    scraper.session().shutdown().await;

    match outcome {
        ScrapeOutcome::Success(result) => {
            let result = filter_by_keywords(&result, &args.filter, args.case_sensitive);
            if args.stats {
                println!("{}", serde_json::to_string_pretty(&statistics(&result))?);
            } else if let Some(base) = &args.output {
                let report = export_to_file(&result, base, args.format).await?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", render(&result, args.format)?);
            }
            Ok(())
        }
        ScrapeOutcome::Failure(failure) => {
            println!("{}", serde_json::to_string_pretty(&failure)?);
            anyhow::bail!("scrape failed: {}", failure.error)
        }
    }
}
