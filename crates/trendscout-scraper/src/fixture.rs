//! Browser backend that serves saved HTML instead of driving Chromium.
//!
//! Used for offline runs against a captured page and as the test double for
//! the orchestrator and the HTTP surface. Pages are served in order, one per
//! opened page; the last one repeats.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::driver::{BrowserBackend, BrowserHandle, PageDriver, PageIdentity};
use crate::error::ScrapeError;

#[derive(Debug, Default)]
struct Counters {
    launches: AtomicU32,
    failed_launches: AtomicU32,
    browser_closes: AtomicU32,
    pages_opened: AtomicU32,
    pages_closed: AtomicU32,
    fail_launches_remaining: AtomicU32,
    fail_pages_remaining: AtomicU32,
    visited: Mutex<Vec<String>>,
    identities: Mutex<Vec<PageIdentity>>,
}

#[derive(Debug, Clone)]
pub struct FixtureBackend {
    pages: Arc<Vec<String>>,
    counters: Arc<Counters>,
}

impl FixtureBackend {
    /// Serves `html` for every page.
    #[must_use]
    pub fn new(html: impl Into<String>) -> Self {
        Self::sequence(vec![html.into()])
    }

    /// Serves `pages[n]` to the n-th opened page, repeating the last one.
    #[must_use]
    pub fn sequence(pages: Vec<String>) -> Self {
        Self {
            pages: Arc::new(pages),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Makes the next `count` launches fail.
    #[must_use]
    pub fn failing_launches(self, count: u32) -> Self {
        self.counters
            .fail_launches_remaining
            .store(count, Ordering::SeqCst);
        self
    }

    /// Makes the next `count` page opens fail, as a crashed browser would.
    #[must_use]
    pub fn failing_pages(self, count: u32) -> Self {
        self.counters
            .fail_pages_remaining
            .store(count, Ordering::SeqCst);
        self
    }

    #[must_use]
    pub fn launches(&self) -> u32 {
        self.counters.launches.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn failed_launches(&self) -> u32 {
        self.counters.failed_launches.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn browser_closes(&self) -> u32 {
        self.counters.browser_closes.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn pages_opened(&self) -> u32 {
        self.counters.pages_opened.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn pages_closed(&self) -> u32 {
        self.counters.pages_closed.load(Ordering::SeqCst)
    }

    /// URLs navigated to, in order.
    #[must_use]
    pub fn visited(&self) -> Vec<String> {
        self.counters
            .visited
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// Identities applied to pages, in order.
    #[must_use]
    pub fn identities(&self) -> Vec<PageIdentity> {
        self.counters
            .identities
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BrowserBackend for FixtureBackend {
    async fn launch(&self) -> Result<Arc<dyn BrowserHandle>, ScrapeError> {
        let remaining = &self.counters.fail_launches_remaining;
        if remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            self.counters.failed_launches.fetch_add(1, Ordering::SeqCst);
            return Err(ScrapeError::Session("fixture launch failure".to_owned()));
        }
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FixtureBrowser {
            backend: self.clone(),
        }))
    }
}

struct FixtureBrowser {
    backend: FixtureBackend,
}

#[async_trait]
impl BrowserHandle for FixtureBrowser {
    async fn new_page(&self) -> Result<Box<dyn PageDriver>, ScrapeError> {
        let counters = &self.backend.counters;
        if counters
            .fail_pages_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ScrapeError::Page("fixture browser disconnected".to_owned()));
        }
        let index = counters.pages_opened.fetch_add(1, Ordering::SeqCst) as usize;
        let pages = &self.backend.pages;
        let html = pages
            .get(index)
            .or_else(|| pages.last())
            .cloned()
            .unwrap_or_default();
        Ok(Box::new(FixturePage {
            html,
            counters: Arc::clone(counters),
        }))
    }

    async fn close(&self) -> Result<(), ScrapeError> {
        self.backend
            .counters
            .browser_closes
            .fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FixturePage {
    html: String,
    counters: Arc<Counters>,
}

#[async_trait]
impl PageDriver for FixturePage {
    async fn prepare(&self, identity: &PageIdentity) -> Result<(), ScrapeError> {
        if let Ok(mut identities) = self.counters.identities.lock() {
            identities.push(identity.clone());
        }
        Ok(())
    }

    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), ScrapeError> {
        if let Ok(mut visited) = self.counters.visited.lock() {
            visited.push(url.to_owned());
        }
        Ok(())
    }

    async fn wait_for_ready(&self, selector: &str, timeout: Duration) -> Result<(), ScrapeError> {
        let selector_parsed = Selector::parse(selector)
            .map_err(|e| ScrapeError::Page(format!("invalid selector {selector}: {e}")))?;
        let found = Html::parse_document(&self.html)
            .select(&selector_parsed)
            .next()
            .is_some();
        if found {
            Ok(())
        } else {
            Err(ScrapeError::ReadyTimeout {
                selector: selector.to_owned(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })
        }
    }

    async fn content(&self) -> Result<String, ScrapeError> {
        Ok(self.html.clone())
    }

    async fn close(&self) -> Result<(), ScrapeError> {
        self.counters.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
