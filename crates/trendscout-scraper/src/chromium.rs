//! Chromium implementation of the page capability traits.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::driver::{BrowserBackend, BrowserHandle, PageDriver, PageIdentity};
use crate::error::ScrapeError;

/// Launch flags applied to every browser process.
pub const LAUNCH_ARGS: [&str; 9] = [
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
    "--disable-blink-features=AutomationControlled",
    "--disable-extensions",
];

const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Launches headless Chromium with a fixed hardened configuration.
#[derive(Debug, Clone, Default)]
pub struct ChromiumBackend {
    chrome_path: Option<PathBuf>,
}

impl ChromiumBackend {
    /// `chrome_path` overrides executable discovery.
    #[must_use]
    pub fn new(chrome_path: Option<PathBuf>) -> Self {
        Self { chrome_path }
    }
}

#[async_trait]
impl BrowserBackend for ChromiumBackend {
    async fn launch(&self) -> Result<Arc<dyn BrowserHandle>, ScrapeError> {
        let mut builder = BrowserConfig::builder().window_size(1920, 1080);
        for arg in LAUNCH_ARGS {
            builder = builder.arg(arg);
        }
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| ScrapeError::Session(format!("browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Session(format!("browser launch failed: {e}")))?;

        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Arc::new(ChromiumBrowser {
            browser: Mutex::new(browser),
            handler_task,
        }))
    }
}

struct ChromiumBrowser {
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserHandle for ChromiumBrowser {
    async fn new_page(&self) -> Result<Box<dyn PageDriver>, ScrapeError> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Page(format!("failed to open page: {e}")))?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(&self) -> Result<(), ScrapeError> {
        let mut browser = self.browser.lock().await;
        let closed = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| ScrapeError::Session(format!("browser close failed: {e}")));
        if let Err(e) = browser.wait().await {
            tracing::debug!(error = %e, "waiting for browser exit failed");
        }
        self.handler_task.abort();
        closed
    }
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn prepare(&self, identity: &PageIdentity) -> Result<(), ScrapeError> {
        let page_err = |e: chromiumoxide::error::CdpError| ScrapeError::Page(e.to_string());

        let mut user_agent = SetUserAgentOverrideParams::new(identity.user_agent.clone());
        user_agent.accept_language = Some(identity.accept_language.clone());
        self.page.execute(user_agent).await.map_err(page_err)?;

        let headers = Headers::new(serde_json::json!({
            "Accept-Language": identity.accept_language,
            "Accept": identity.accept,
        }));
        self.page
            .execute(SetExtraHttpHeadersParams::new(headers))
            .await
            .map_err(page_err)?;

        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                i64::from(identity.viewport_width),
                i64::from(identity.viewport_height),
                1.0,
                false,
            ))
            .await
            .map_err(page_err)?;
        Ok(())
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ScrapeError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ScrapeError::Navigation {
                url: url.to_owned(),
                reason: e.to_string(),
            }),
            Err(_) => Err(ScrapeError::Navigation {
                url: url.to_owned(),
                reason: format!("timed out after {}ms", millis(timeout)),
            }),
        }
    }

    async fn wait_for_ready(&self, selector: &str, timeout: Duration) -> Result<(), ScrapeError> {
        let poll = async {
            loop {
                if self.page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(READY_POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| ScrapeError::ReadyTimeout {
                selector: selector.to_owned(),
                timeout_ms: millis(timeout),
            })
    }

    async fn content(&self) -> Result<String, ScrapeError> {
        self.page
            .content()
            .await
            .map_err(|e| ScrapeError::Page(format!("failed to read content: {e}")))
    }

    async fn close(&self) -> Result<(), ScrapeError> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| ScrapeError::Page(format!("page close failed: {e}")))
    }
}
