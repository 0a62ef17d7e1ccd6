// src/fetch/browser.rs

//! Headless Chromium for pages that build their holdings table client-side.

use anyhow::{anyhow, Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetTimezoneOverrideParams;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};
use url::Url;

use super::USER_AGENT;

pub const MARKET_TIMEZONE: &str = "Asia/Taipei";
pub const BROWSER_LOCALE: &str = "zh-TW";

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(90);
const SETTLE_DELAY: Duration = Duration::from_secs(6);

/// How rendered pages are loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Chromium binary; `None` lets the browser crate look it up (it honours `CHROME`).
    pub executable: Option<PathBuf>,
    pub navigation_timeout: Duration,
    /// Extra wait after the load event for scripts to fill the table.
    pub settle_delay: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            executable: None,
            navigation_timeout: NAVIGATION_TIMEOUT,
            settle_delay: SETTLE_DELAY,
        }
    }
}

fn browser_config(options: &RenderOptions) -> Result<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .no_sandbox()
        .arg(format!("--lang={}", BROWSER_LOCALE))
        .arg(format!("--user-agent={}", USER_AGENT))
        .request_timeout(options.navigation_timeout);
    if let Some(path) = &options.executable {
        builder = builder.chrome_executable(path);
    }
    builder
        .build()
        .map_err(|e| anyhow!(e))
        .context("configuring headless browser")
}

/// Load `url` in a fresh headless browser and return the DOM after scripts ran.
pub async fn render_page(url: &Url, options: &RenderOptions) -> Result<String> {
    let config = browser_config(options)?;
    let (mut browser, mut handler) = Browser::launch(config)
        .await
        .context("launching headless browser")?;
    let events = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    let rendered = load_content(&browser, url, options).await;

    if let Err(e) = browser.close().await {
        warn!(%url, error = %e, "closing headless browser");
    }
    let _ = browser.wait().await;
    events.abort();
    rendered
}

async fn load_content(browser: &Browser, url: &Url, options: &RenderOptions) -> Result<String> {
    let page = browser
        .new_page("about:blank")
        .await
        .context("opening browser tab")?;
    page.execute(SetTimezoneOverrideParams::new(MARKET_TIMEZONE))
        .await
        .context("setting browser timezone")?;

    debug!(%url, "rendering page");
    timeout(options.navigation_timeout, page.goto(url.as_str()))
        .await
        .with_context(|| format!("timed out loading {}", url))?
        .with_context(|| format!("navigating to {}", url))?;
    sleep(options.settle_delay).await;

    page.content()
        .await
        .with_context(|| format!("reading rendered DOM of {}", url))
}
