//! One logical scrape: lease the shared browser, run attempts with linear
//! backoff, and hand back a well-formed outcome.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use trendscout_core::{
    resolve_region_code, validate_limit, AppConfig, CoreError, Region, ScrapedTrend, TimeWindow,
};

use crate::driver::{PageDriver, PageIdentity};
use crate::error::ScrapeError;
use crate::extract::{extract_trends, Extraction, CANONICAL_BODY_SELECTOR, ROW_SELECTOR};
use crate::retry::retry_linear;
use crate::session::{BrowserSession, SessionLease};

/// Rows returned when the caller does not ask for a specific count.
pub const DEFAULT_LIMIT: usize = 25;

/// Largest limit the HTTP surface accepts; update runs scrape this many.
pub const MAX_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Configuration and request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub identity: PageIdentity,
    /// Total attempts per logical scrape.
    pub max_retries: u32,
    /// Attempt `n` failing is followed by a sleep of `n * base_delay`.
    pub base_delay: Duration,
    pub navigation_timeout: Duration,
    /// Structural element whose presence marks the page as loaded.
    pub ready_selector: String,
    pub ready_timeout: Duration,
    /// Best-effort wait for the canonical rows after the settle delay.
    pub rows_timeout: Duration,
    /// Pause for client-side rendering once the page is ready, before the
    /// row waits.
    pub settle_delay: Duration,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://trends.google.com/trending".to_owned(),
            identity: PageIdentity::desktop(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            ),
            max_retries: 3,
            base_delay: Duration::from_millis(3000),
            navigation_timeout: Duration::from_secs(60),
            ready_selector: "table".to_owned(),
            ready_timeout: Duration::from_secs(30),
            rows_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_millis(5000),
        }
    }
}

impl ScrapeConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.scraper_base_url.clone(),
            identity: PageIdentity::desktop(config.scraper_user_agent.clone()),
            max_retries: config.scraper_max_retries,
            base_delay: Duration::from_millis(config.scraper_retry_base_delay_ms),
            navigation_timeout: Duration::from_secs(config.scraper_navigation_timeout_secs),
            ready_timeout: Duration::from_secs(config.scraper_ready_timeout_secs),
            settle_delay: Duration::from_millis(config.scraper_settle_delay_ms),
            ..Self::default()
        }
    }
}

/// A validated `(geo, window, limit)` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub geo: String,
    pub window: TimeWindow,
    pub limit: usize,
}

impl ScrapeRequest {
    /// `country` may be a route slug (`india`) or a raw region code (`de`).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] for a blank country or a non-positive limit.
    pub fn new(country: &str, window: TimeWindow, limit: i64) -> Result<Self, CoreError> {
        Ok(Self {
            geo: resolve_region_code(country)?,
            window,
            limit: validate_limit(limit)?,
        })
    }

    /// Request for one of the fixed region routes, at the default limit.
    #[must_use]
    pub fn for_region(region: Region, window: TimeWindow) -> Self {
        Self {
            geo: region.code().to_owned(),
            window,
            limit: DEFAULT_LIMIT,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Successful scrape payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub success: bool,
    pub country: String,
    /// Human label of the window, e.g. `"24 hours"`.
    pub time_range: String,
    pub total_trends: usize,
    /// Wall-clock time across all attempts, in milliseconds.
    pub scraping_duration: u64,
    pub scraped_at: DateTime<Utc>,
    pub page_url: String,
    pub trends: Vec<ScrapedTrend>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeFailure {
    pub success: bool,
    pub error: String,
    pub country: String,
    pub time_range: String,
}

/// What callers of [`TrendScraper::fetch_trends`] always get back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScrapeOutcome {
    Success(ScrapeResult),
    Failure(ScrapeFailure),
}

impl ScrapeOutcome {
    fn failure(error: &ScrapeError, country: &str, time_range: String) -> Self {
        ScrapeOutcome::Failure(ScrapeFailure {
            success: false,
            error: error.to_string(),
            country: country.to_owned(),
            time_range,
        })
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ScrapeOutcome::Success(_))
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct TrendScraper {
    session: Arc<BrowserSession>,
    config: ScrapeConfig,
}

impl TrendScraper {
    #[must_use]
    pub fn new(session: Arc<BrowserSession>, config: ScrapeConfig) -> Self {
        Self { session, config }
    }

    #[must_use]
    pub fn session(&self) -> &Arc<BrowserSession> {
        &self.session
    }

    #[must_use]
    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    #[must_use]
    pub fn page_url(&self, geo: &str, hours: u32) -> String {
        format!("{}?geo={geo}&hours={hours}", self.config.base_url)
    }

    /// Provenance stored alongside every trend from `result`.
    #[must_use]
    pub fn provenance(&self, result: &ScrapeResult) -> serde_json::Value {
        serde_json::json!({
            "scrapingDuration": result.scraping_duration,
            "userAgent": self.config.identity.user_agent,
            "pageUrl": result.page_url,
        })
    }

    /// Scrapes one request and never fails: errors come back as
    /// [`ScrapeOutcome::Failure`].
    pub async fn fetch_trends(&self, request: &ScrapeRequest) -> ScrapeOutcome {
        match self.scrape(request).await {
            Ok(result) => ScrapeOutcome::Success(result),
            Err(e) => {
                tracing::error!(
                    geo = %request.geo,
                    hours = request.window.hours(),
                    error = %e,
                    "scrape failed"
                );
                ScrapeOutcome::failure(&e, &request.geo, request.window.label())
            }
        }
    }

    /// Validates raw caller input and scrapes. Invalid input is reported as
    /// a failure outcome, like any other error.
    pub async fn fetch_trends_for(&self, country: &str, hours: u32, limit: i64) -> ScrapeOutcome {
        let request = TimeWindow::from_hours(hours)
            .and_then(|window| ScrapeRequest::new(country, window, limit));
        match request {
            Ok(request) => self.fetch_trends(&request).await,
            Err(e) => ScrapeOutcome::failure(
                &ScrapeError::InvalidRequest(e),
                country,
                format!("{hours} hours"),
            ),
        }
    }

    /// Scrapes with the retry budget, holding one session lease for the
    /// whole call. The lease is released on every path.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Exhausted`] wrapping the last attempt's error
    /// once every attempt has failed.
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResult, ScrapeError> {
        let started = Instant::now();
        let hours = request.window.hours();
        let page_url = self.page_url(&request.geo, hours);
        tracing::info!(geo = %request.geo, hours, limit = request.limit, "scraping trends");

        let lease = self.session.lease();
        let extraction = retry_linear(self.config.max_retries, self.config.base_delay, |attempt| {
            self.attempt(&lease, request, &page_url, attempt)
        })
        .await;
        lease.release().await;
        let extraction = extraction?;

        let scraping_duration = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            geo = %request.geo,
            hours,
            trends = extraction.trends.len(),
            duration_ms = scraping_duration,
            "scrape complete"
        );

        Ok(ScrapeResult {
            success: true,
            country: request.geo.clone(),
            time_range: request.window.label(),
            total_trends: extraction.trends.len(),
            scraping_duration,
            scraped_at: Utc::now(),
            page_url,
            trends: extraction.trends,
        })
    }

    async fn attempt(
        &self,
        lease: &SessionLease,
        request: &ScrapeRequest,
        page_url: &str,
        attempt: u32,
    ) -> Result<Extraction, ScrapeError> {
        tracing::debug!(geo = %request.geo, attempt, "starting scrape attempt");
        let browser = lease.browser().await?;
        let page = match browser.new_page().await {
            Ok(page) => page,
            Err(e) => {
                // A browser that cannot open a page has crashed or lost its
                // connection; relaunch on the next attempt.
                tracing::warn!(error = %e, "page open failed, invalidating browser");
                lease.invalidate().await;
                return Err(e);
            }
        };

        let outcome = self.load_and_extract(page.as_ref(), request, page_url).await;

        if let Err(e) = page.close().await {
            tracing::warn!(error = %e, "page close failed");
        }
        outcome
    }

    async fn load_and_extract(
        &self,
        page: &dyn PageDriver,
        request: &ScrapeRequest,
        page_url: &str,
    ) -> Result<Extraction, ScrapeError> {
        page.prepare(&self.config.identity).await?;
        page.navigate(page_url, self.config.navigation_timeout).await?;
        page.wait_for_ready(&self.config.ready_selector, self.config.ready_timeout)
            .await?;
        tokio::time::sleep(self.config.settle_delay).await;

        for selector in [CANONICAL_BODY_SELECTOR, ROW_SELECTOR] {
            if let Err(e) = page.wait_for_ready(selector, self.config.rows_timeout).await {
                tracing::debug!(selector, error = %e, "rows not rendered yet, continuing");
            }
        }

        let html = page.content().await?;
        let extraction = extract_trends(
            &html,
            request.limit,
            &request.geo,
            &request.window.tag(),
            Utc::now(),
        )?;
        tracing::debug!(
            strategy = extraction.trace.strategy.unwrap_or("none"),
            rows_inspected = extraction.trace.rows_inspected,
            rows_scanned = extraction.trace.rows_scanned,
            skipped = extraction.trace.skipped.len(),
            trace = ?extraction.trace,
            "extraction trace"
        );
        Ok(extraction)
    }
}
