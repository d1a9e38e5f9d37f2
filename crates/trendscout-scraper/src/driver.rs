//! Capability seams between orchestration and the concrete browser.
//!
//! The orchestrator only ever talks to these traits, so the Chromium driver
//! can be swapped for a fake that serves HTML fixtures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScrapeError;

/// Launches browser processes. One backend is shared by a [`crate::BrowserSession`].
#[async_trait]
pub trait BrowserBackend: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn BrowserHandle>, ScrapeError>;
}

/// A live browser process.
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    /// Opens a fresh, isolated page.
    async fn new_page(&self) -> Result<Box<dyn PageDriver>, ScrapeError>;

    /// Terminates the process. Called once, when the last lease is released.
    async fn close(&self) -> Result<(), ScrapeError>;
}

/// One open page.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Applies user agent, request headers and viewport before navigation.
    async fn prepare(&self, identity: &PageIdentity) -> Result<(), ScrapeError>;

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ScrapeError>;

    /// Waits until `selector` matches at least one element.
    async fn wait_for_ready(&self, selector: &str, timeout: Duration) -> Result<(), ScrapeError>;

    /// Serialized DOM of the page as currently rendered.
    async fn content(&self) -> Result<String, ScrapeError>;

    async fn close(&self) -> Result<(), ScrapeError>;
}

/// How a page presents itself to the remote site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageIdentity {
    pub user_agent: String,
    pub accept_language: String,
    pub accept: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl PageIdentity {
    #[must_use]
    pub fn desktop(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            accept_language: "en-US,en;q=0.9".to_owned(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .to_owned(),
            viewport_width: 1920,
            viewport_height: 1080,
        }
    }
}
