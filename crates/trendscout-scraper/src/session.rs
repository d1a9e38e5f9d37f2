//! Reference-counted browser session.
//!
//! One browser process is shared by every concurrent scrape call. Each call
//! holds a [`SessionLease`]; the process is launched lazily by the first
//! lease that needs a browser and closed when the last lease is released.
//! A call therefore never sees its browser torn down by a sibling call.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::driver::{BrowserBackend, BrowserHandle};
use crate::error::ScrapeError;

#[derive(Default)]
struct SessionState {
    browser: Option<Arc<dyn BrowserHandle>>,
    leases: usize,
}

pub struct BrowserSession {
    backend: Arc<dyn BrowserBackend>,
    state: Mutex<SessionState>,
}

impl BrowserSession {
    #[must_use]
    pub fn new(backend: Arc<dyn BrowserBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Registers a borrower and returns the live browser, launching one if
    /// none is running.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Session`] if the launch fails. The borrower is
    /// not registered in that case and the handle stays unset, so the next
    /// call retries the launch from scratch.
    pub async fn acquire(&self) -> Result<Arc<dyn BrowserHandle>, ScrapeError> {
        let mut state = self.state.lock().await;
        let browser = match &state.browser {
            Some(browser) => Arc::clone(browser),
            None => {
                tracing::info!("launching browser");
                let browser = self.backend.launch().await?;
                state.browser = Some(Arc::clone(&browser));
                browser
            }
        };
        state.leases += 1;
        tracing::debug!(leases = state.leases, "browser session acquired");
        Ok(browser)
    }

    /// Drops one borrower. The browser is closed when the count reaches
    /// zero. No-op when nothing is active.
    pub async fn release(&self) {
        let mut state = self.state.lock().await;
        state.leases = state.leases.saturating_sub(1);
        tracing::debug!(leases = state.leases, "browser session released");
        if state.leases > 0 {
            return;
        }
        if let Some(browser) = state.browser.take() {
            tracing::info!("closing browser, no active leases");
            if let Err(e) = browser.close().await {
                tracing::warn!(error = %e, "browser close failed");
            }
        }
    }

    /// Closes the browser regardless of outstanding leases. Used on process
    /// shutdown.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.leases = 0;
        if let Some(browser) = state.browser.take() {
            tracing::info!("shutting down browser");
            if let Err(e) = browser.close().await {
                tracing::warn!(error = %e, "browser close failed during shutdown");
            }
        }
    }

    /// Drops one borrower and retires `stale` if it is still the live
    /// browser, so the next [`acquire`](Self::acquire) launches a new process.
    /// Other borrowers of the old handle keep their count and retire it the
    /// same way when they hit the failure.
    pub async fn invalidate(&self, stale: &Arc<dyn BrowserHandle>) {
        let mut state = self.state.lock().await;
        state.leases = state.leases.saturating_sub(1);
        let is_live = state
            .browser
            .as_ref()
            .is_some_and(|browser| Arc::ptr_eq(browser, stale));
        if !is_live && state.leases > 0 {
            return;
        }
        if let Some(browser) = state.browser.take() {
            tracing::warn!(leases = state.leases, "retiring unusable browser");
            if let Err(e) = browser.close().await {
                tracing::debug!(error = %e, "close of retired browser failed");
            }
        }
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.browser.is_some()
    }

    pub async fn active_leases(&self) -> usize {
        self.state.lock().await.leases
    }

    /// Starts a logical call. The lease acquires the browser on first use
    /// and holds it until [`SessionLease::release`].
    #[must_use]
    pub fn lease(self: &Arc<Self>) -> SessionLease {
        SessionLease {
            session: Arc::clone(self),
            browser: Mutex::new(None),
        }
    }
}

/// One logical call's hold on the shared browser.
///
/// Launch failures inside [`SessionLease::browser`] leave the lease empty,
/// so a later attempt in the same call can try again.
pub struct SessionLease {
    session: Arc<BrowserSession>,
    browser: Mutex<Option<Arc<dyn BrowserHandle>>>,
}

impl SessionLease {
    /// # Errors
    ///
    /// Returns [`ScrapeError::Session`] if the browser has to be launched and
    /// the launch fails.
    pub async fn browser(&self) -> Result<Arc<dyn BrowserHandle>, ScrapeError> {
        let mut held = self.browser.lock().await;
        if let Some(browser) = held.as_ref() {
            return Ok(Arc::clone(browser));
        }
        let browser = self.session.acquire().await?;
        *held = Some(Arc::clone(&browser));
        Ok(browser)
    }

    /// Forgets a browser that can no longer open pages. The next
    /// [`browser`](Self::browser) call acquires again, relaunching if needed.
    pub async fn invalidate(&self) {
        let held = self.browser.lock().await.take();
        if let Some(stale) = held {
            self.session.invalidate(&stale).await;
        }
    }

    /// Gives the browser back. Lease holders that never obtained a browser
    /// release nothing.
    pub async fn release(self) {
        let held = self.browser.lock().await.take();
        if held.is_some() {
            self.session.release().await;
        }
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        if self.browser.get_mut().take().is_none() {
            return;
        }
        // The owning future was dropped before release ran.
        tracing::warn!("session lease dropped without release, releasing in background");
        let session = Arc::clone(&self.session);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { session.release().await });
        }
    }
}
