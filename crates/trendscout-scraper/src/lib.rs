pub mod chromium;
pub mod driver;
pub mod error;
pub mod extract;
pub mod fixture;
pub mod orchestrator;
pub(crate) mod retry;
pub mod session;

pub use chromium::ChromiumBackend;
pub use driver::{BrowserBackend, BrowserHandle, PageDriver, PageIdentity};
pub use error::ScrapeError;
pub use extract::{extract_titles, extract_trends, Extraction, ExtractionTrace, RowSkip};
pub use fixture::FixtureBackend;
pub use orchestrator::{
    ScrapeConfig, ScrapeFailure, ScrapeOutcome, ScrapeRequest, ScrapeResult, TrendScraper,
    DEFAULT_LIMIT, MAX_LIMIT,
};
pub use session::{BrowserSession, SessionLease};
