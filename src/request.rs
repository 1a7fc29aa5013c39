use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::{task::JoinHandle, time::timeout};

use crate::{info_time, warn_time, Config, Error, FetchError, FetchResult, Result};

/// How long the network has to stay quiet before the page counts as idle.
const IDLE_WINDOW_MS: u64 = 500;
const IDLE_POLL_MS: u64 = 100;
/// Resource timing entries kept by the page, the browser default (250) fills up on big pages.
const RESOURCE_BUFFER_SIZE: u32 = 10_000;
/// Extra time a CDP command gets on top of the longest wait we put on it.
const CDP_HEADROOM_MS: u64 = 5_000;

/// The browser capabilities the scraper needs. One page, driven sequentially.
#[async_trait]
pub trait PageDriver {
    /// Navigates to `url`. A `FetchError::Timeout` leaves whatever already loaded in place.
    async fn goto(&mut self, url: &str, limit: Duration) -> FetchResult<()>;

    /// Waits until no new network requests show up for a short window.
    async fn wait_for_idle(&mut self, limit: Duration) -> FetchResult<()>;

    /// Snapshot of the current DOM as HTML.
    async fn content(&mut self) -> FetchResult<String>;
}

/// A Chromium tab driven over CDP.
pub struct ChromePage {
    page: Page,
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn goto(&mut self, url: &str, limit: Duration) -> FetchResult<()> {
        match timeout(limit, self.page.goto(url)).await {
            Ok(res) => res.map(|_| ()).map_err(|e| classify(e, limit)),
            Err(_) => Err(FetchError::Timeout(limit)),
        }
    }

    async fn wait_for_idle(&mut self, limit: Duration) -> FetchResult<()> {
        let script = idle_script(limit);
        // Give the script its own deadline a little headroom so it can answer first.
        let outer = limit + Duration::from_millis(IDLE_WINDOW_MS);
        let evaluated = match timeout(outer, self.page.evaluate(script)).await {
            Ok(res) => res.map_err(|e| classify(e, limit))?,
            Err(_) => return Err(FetchError::Timeout(limit)),
        };
        let settled = evaluated
            .into_value::<bool>()
            .map_err(|e| FetchError::Protocol(e.to_string()))?;

        if settled {
            Ok(())
        } else {
            Err(FetchError::Timeout(limit))
        }
    }

    async fn content(&mut self) -> FetchResult<String> {
        Ok(self.page.content().await?)
    }
}

/// chromiumoxide's own command timeout is still a bounded wait running out, not a broken page.
fn classify(err: CdpError, limit: Duration) -> FetchError {
    match err {
        CdpError::Timeout => FetchError::Timeout(limit),
        other => other.into(),
    }
}

/// CDP command budget, always longer than the idle wait so the script answers before
/// chromiumoxide gives up on it.
fn cdp_request_timeout(config: &Config) -> Duration {
    config.navigation_timeout.max(config.idle_timeout)
        + Duration::from_millis(IDLE_WINDOW_MS + CDP_HEADROOM_MS)
}

/// Resolves to `true` once `document.readyState` is complete and the resource count stopped
/// growing for `IDLE_WINDOW_MS`, or `false` when `limit` runs out first.
fn idle_script(limit: Duration) -> String {
    let limit_ms = limit.as_millis().min(u128::from(u64::MAX)) as u64;
    format!(
        r#"(async () => {{
            try {{ performance.setResourceTimingBufferSize({RESOURCE_BUFFER_SIZE}); }} catch (_) {{}}
            const count = () => {{
                try {{ return performance.getEntriesByType('resource').length; }} catch (_) {{ return 0; }}
            }};
            const start = Date.now();
            let last = count();
            let stable = 0;
            while (Date.now() - start < {limit_ms}) {{
                await new Promise(r => setTimeout(r, {IDLE_POLL_MS}));
                const cur = count();
                if (document.readyState === 'complete' && cur === last) {{
                    stable += {IDLE_POLL_MS};
                    if (stable >= {IDLE_WINDOW_MS}) return true;
                }} else {{
                    stable = 0;
                }}
                last = cur;
            }}
            return false;
        }})()"#
    )
}

/// The one browser (and its single page) a run owns.
/// Call [`BrowserSession::close`] when done; dropping it only kills the child process.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: ChromePage,
}

impl BrowserSession {
    pub async fn launch(config: &Config) -> Result<Self> {
        info_time!("Launching browser (headless: {})", config.headless);

        let mut builder = BrowserConfig::builder().request_timeout(cdp_request_timeout(config));
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(Error::BrowserConfig)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn_time!("Browser handler error: {e}");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(e.into());
            }
        };

        Ok(Self {
            browser,
            handler,
            page: ChromePage { page },
        })
    }

    pub fn page(&mut self) -> &mut ChromePage {
        &mut self.page
    }

    pub async fn close(mut self) -> Result<()> {
        info_time!("Closing browser...");
        let closed = self.browser.close().await;
        // Reap the child either way so no zombie is left behind.
        if let Err(e) = self.browser.wait().await {
            warn_time!("Couldn't wait for the browser process: {e}");
        }
        self.handler.abort();
        closed?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdp_timeout_is_a_timeout() {
        let limit = Duration::from_secs(10);
        assert!(matches!(
            classify(CdpError::Timeout, limit),
            FetchError::Timeout(l) if l == limit
        ));
        assert!(matches!(
            classify(
                CdpError::from(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed")),
                limit
            ),
            FetchError::Protocol(_)
        ));
    }

    #[test]
    fn cdp_budget_outlasts_the_idle_wait() {
        let config = Config::default();
        let budget = cdp_request_timeout(&config);
        assert!(budget > config.idle_timeout + Duration::from_millis(IDLE_WINDOW_MS));
        assert!(budget > config.navigation_timeout);
    }

    #[test]
    fn idle_script_grows_the_resource_buffer() {
        let script = idle_script(Duration::from_millis(1234));
        assert!(script.contains("setResourceTimingBufferSize(10000)"));
        assert!(script.contains("< 1234"));
        // The buffer has to be grown before the first count.
        let grow = script.find("setResourceTimingBufferSize").unwrap();
        let count = script.find("getEntriesByType").unwrap();
        assert!(grow < count);
    }
}
