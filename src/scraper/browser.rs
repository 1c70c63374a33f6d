//! Browser automation using chromiumoxide.

use chromiumoxide::browser::{Browser as ChromeBrowser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ScraperConfig;
use crate::retry::{retry_anyhow, RetryConfig};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Why a page could not be rendered.
#[derive(Error, Debug, Clone)]
pub enum RenderError {
    #[error("network error loading {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} loading {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("render of {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("browser error: {0}")]
    Browser(String),
}

/// Anything that can turn a URL into fully rendered page content.
#[allow(async_fn_in_trait)]
pub trait PageRenderer {
    async fn render(&self, url: &str) -> Result<String, RenderError>;
}

/// Launch and render settings.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub chrome_path: Option<String>,
    /// Time given to client-side script after navigation.
    pub settle: Duration,
    /// Ceiling for one whole render.
    pub render_timeout: Duration,
}

impl BrowserOptions {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            headless: config.headless,
            chrome_path: config.chrome_path.clone(),
            settle: Duration::from_millis(config.settle_ms),
            render_timeout: Duration::from_secs(config.render_timeout_secs),
        }
    }

    fn chrome_executable(&self) -> String {
        if let Some(path) = &self.chrome_path {
            return path.clone();
        }
        if cfg!(target_os = "macos") {
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome".to_string()
        } else if cfg!(target_os = "windows") {
            "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe".to_string()
        } else {
            "google-chrome".to_string()
        }
    }
}

/// Browser wrapper for rendering rating-history pages
pub struct Browser {
    browser: ChromeBrowser,
    handle: tokio::task::JoinHandle<()>,
    options: BrowserOptions,
}

impl Browser {
    /// Launch a browser, retrying transient launch failures.
    pub async fn launch(options: BrowserOptions) -> anyhow::Result<Self> {
        retry_anyhow(&RetryConfig::browser(), "browser launch", || {
            Self::launch_once(options.clone())
        })
        .await
    }

    async fn launch_once(options: BrowserOptions) -> anyhow::Result<Self> {
        let mut builder = BrowserConfig::builder()
            .chrome_executable(options.chrome_executable())
            .no_sandbox()
            .disable_default_args()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-extensions")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", USER_AGENT))
            .window_size(1920, 1080);

        if options.headless {
            builder = builder.arg("--headless=new");
        }

        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = ChromeBrowser::launch(config)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to launch browser: {}", e))?;

        // Handler must keep running for the browser to work
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler event error: {}", e);
                }
            }
        });

        Ok(Self {
            browser,
            handle,
            options,
        })
    }

    async fn load(&self, url: &str) -> Result<String, RenderError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;

        let result = Self::navigate(&page, url, self.options.settle).await;
        if let Err(e) = page.close().await {
            debug!("Failed to close tab for {}: {}", url, e);
        }
        result
    }

    async fn navigate(page: &Page, url: &str, settle: Duration) -> Result<String, RenderError> {
        page.goto(url).await.map_err(|e| RenderError::Network {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let request = page
            .wait_for_navigation_response()
            .await
            .map_err(|e| RenderError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = request
            .as_ref()
            .and_then(|req| req.response.as_ref())
            .map(|resp| resp.status);
        if let Some(status) = status {
            if status >= 400 {
                return Err(RenderError::HttpStatus {
                    url: url.to_string(),
                    status: u16::try_from(status).unwrap_or(u16::MAX),
                });
            }
        }

        // Let client-side rendering settle
        tokio::time::sleep(settle).await;

        page.content()
            .await
            .map_err(|e| RenderError::Browser(format!("Failed to get page content: {}", e)))
    }

    /// Close the browser
    pub async fn close(mut self) -> anyhow::Result<()> {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Browser process did not exit cleanly: {}", e);
        }
        self.handle.abort();
        Ok(())
    }
}

impl PageRenderer for Browser {
    async fn render(&self, url: &str) -> Result<String, RenderError> {
        let timeout = self.options.render_timeout;
        match tokio::time::timeout(timeout, self.load(url)).await {
            Ok(result) => result,
            Err(_) => Err(RenderError::Timeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }
}
