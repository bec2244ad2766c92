use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{BotError, Result};

/// Resale page watched by the bot
pub const TARGET_URL: &str = "https://tickets.rugbyworldcup.com/fr";

/// Element that only exists once the client-side match list has rendered
const READY_SELECTOR: &str = ".match-label";

/// HTML of the page after its dynamic content has settled
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub url: String,
    pub html: String,
}

/// What `ensure_ready` had to do to get a usable page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Browser and page were alive and have been reused
    Reused,
    /// Browser and/or page were (re)created and navigated
    Created,
}

/// A long-lived browser page on the target URL
#[async_trait]
pub trait Renderer: Send {
    /// Make sure a browser and a navigated page exist, recreating either if dead
    async fn ensure_ready(&mut self) -> Result<Readiness>;

    /// Reload the page, wait for it to settle and return its HTML
    async fn reload(&mut self) -> Result<RenderedDocument>;

    /// Wait for the current page to settle and return its HTML without navigating
    async fn capture(&mut self) -> Result<RenderedDocument>;

    /// Drop browser and page; the next `ensure_ready` starts from scratch
    async fn teardown(&mut self);
}

/// Settings for the headless Chrome session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub url: String,
    pub chrome_path: Option<PathBuf>,
    pub navigation_timeout: Duration,
    pub settle_delay: Duration,
    /// Chrome exits on its own after this long without CDP traffic
    pub idle_timeout: Duration,
}

/// Headless Chrome process plus one tab, reused across cycles.
///
/// All CDP calls block, so they run on the blocking pool.
pub struct ChromeSession {
    config: SessionConfig,
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
}

impl ChromeSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            browser: None,
            tab: None,
        }
    }

    fn launch(config: &SessionConfig) -> Result<Browser> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .ignore_certificate_errors(true)
            .path(config.chrome_path.clone())
            .idle_browser_timeout(config.idle_timeout)
            .build()
            .map_err(|e| render_error("building launch options", e))?;

        Browser::new(options).map_err(|e| render_error("launching browser", e))
    }

    fn open_tab(browser: &Browser, config: &SessionConfig) -> Result<Arc<Tab>> {
        let tab = browser
            .new_tab()
            .map_err(|e| render_error("opening tab", e))?;
        tab.set_default_timeout(config.navigation_timeout);
        tab.navigate_to(&config.url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| render_error("navigating to target", e))?;
        Ok(tab)
    }

    /// Health checks that round-trip through the DevTools connection
    fn browser_usable(browser: &Browser) -> bool {
        browser.get_version().is_ok()
    }

    fn tab_usable(tab: &Tab) -> bool {
        tab.get_target_info().is_ok()
    }

    fn tab(&self) -> Result<Arc<Tab>> {
        self.tab.clone().ok_or_else(|| BotError::Render {
            message: "no page open".to_string(),
        })
    }
}

#[async_trait]
impl Renderer for ChromeSession {
    async fn ensure_ready(&mut self) -> Result<Readiness> {
        let config = self.config.clone();
        let browser = self.browser.take();
        let tab = self.tab.take();

        let (browser, tab, readiness) = tokio::task::spawn_blocking(move || {
            let mut readiness = Readiness::Reused;

            let browser = match browser {
                Some(b) if ChromeSession::browser_usable(&b) => b,
                _ => {
                    info!("Launching headless browser");
                    readiness = Readiness::Created;
                    ChromeSession::launch(&config)?
                }
            };

            let tab = match tab {
                Some(t) if readiness == Readiness::Reused && ChromeSession::tab_usable(&t) => t,
                _ => {
                    info!("Opening page {}", config.url);
                    readiness = Readiness::Created;
                    ChromeSession::open_tab(&browser, &config)?
                }
            };

            Ok::<_, BotError>((browser, tab, readiness))
        })
        .await
        .map_err(|e| render_error("browser task", e))??;

        self.browser = Some(browser);
        self.tab = Some(tab);
        Ok(readiness)
    }

    async fn reload(&mut self) -> Result<RenderedDocument> {
        let tab = self.tab()?;

        tokio::task::spawn_blocking(move || {
            tab.reload(false, None)
                .and_then(|t| t.wait_until_navigated())
                .map(|_| ())
                .map_err(|e| render_error("reloading page", e))
        })
        .await
        .map_err(|e| render_error("browser task", e))??;

        self.capture().await
    }

    async fn capture(&mut self) -> Result<RenderedDocument> {
        let tab = self.tab()?;

        let wait_tab = tab.clone();
        tokio::task::spawn_blocking(move || {
            // Bounded by the tab's default timeout
            if let Err(e) = wait_tab.wait_for_element(READY_SELECTOR) {
                warn!("No '{}' on page: {}", READY_SELECTOR, e);
            }
        })
        .await
        .map_err(|e| render_error("browser task", e))?;

        tokio::time::sleep(self.config.settle_delay).await;

        let content_tab = tab.clone();
        let html = tokio::task::spawn_blocking(move || {
            content_tab
                .get_content()
                .map_err(|e| render_error("reading document", e))
        })
        .await
        .map_err(|e| render_error("browser task", e))??;

        Ok(RenderedDocument {
            url: tab.get_url(),
            html,
        })
    }

    async fn teardown(&mut self) {
        let tab = self.tab.take();
        let browser = self.browser.take();
        if tab.is_none() && browser.is_none() {
            return;
        }

        info!("Tearing down browser session");
        // Closing talks to Chrome, and dropping Browser kills the process
        let _ = tokio::task::spawn_blocking(move || {
            if let Some(tab) = tab {
                let _ = tab.close(false);
            }
            drop(browser);
        })
        .await;
    }
}

fn render_error(action: &str, err: impl std::fmt::Display) -> BotError {
    BotError::Render {
        message: format!("{}: {}", action, err),
    }
}
