use thiserror::Error;
use trendscout_core::CoreError;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("browser session error: {0}")]
    Session(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out after {timeout_ms}ms waiting for {selector}")]
    ReadyTimeout { selector: String, timeout_ms: u64 },

    #[error("page error: {0}")]
    Page(String),

    #[error("No trends data found - page structure may have changed")]
    NoData,

    #[error("Failed to scrape Google Trends after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<ScrapeError>,
    },

    #[error(transparent)]
    InvalidRequest(#[from] CoreError),
}

impl ScrapeError {
    /// Returns `true` when another attempt could plausibly succeed.
    ///
    /// Launch failures, navigation/readiness timeouts, page-level CDP errors
    /// and empty extractions all count against the retry budget. Bad input
    /// and an already exhausted budget never do.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScrapeError::Session(_)
                | ScrapeError::Navigation { .. }
                | ScrapeError::ReadyTimeout { .. }
                | ScrapeError::Page(_)
                | ScrapeError::NoData
        )
    }
}
