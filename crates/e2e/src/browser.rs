//! Browser session driver
//!
//! [`PageDriver`] is the small set of page interactions the checkout flow
//! needs. [`BrowserSession`] implements it over a WebDriver session on a
//! headless Chrome managed by a [`DriverProcess`].

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use thirtyfour::prelude::*;
use thirtyfour::{ChromeCapabilities, ChromiumLikeCapabilities};
use tracing::{debug, info, warn};

use cartcheck_common::BrowserConfig;

use crate::driver::DriverProcess;
use crate::error::{E2eError, E2eResult};
use crate::wait::poll_until;

/// How an element is located on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(String),
    Class(String),
}

impl Locator {
    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    pub fn class(class: impl Into<String>) -> Self {
        Locator::Class(class.into())
    }

    fn by(&self) -> By {
        match self {
            Locator::Id(id) => By::Id(id.as_str()),
            Locator::Class(class) => By::ClassName(class.as_str()),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "#{}", id),
            Locator::Class(class) => write!(f, ".{}", class),
        }
    }
}

/// Page interactions used by the checkout flow
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Load a URL in the current window
    async fn goto(&self, url: &str) -> E2eResult<()>;

    /// Block until the element is present, bounded by the wait timeout
    async fn wait_for(&self, locator: &Locator) -> E2eResult<()>;

    /// Visible text of an element that is already present
    async fn text(&self, locator: &Locator) -> E2eResult<String>;

    async fn click(&self, locator: &Locator) -> E2eResult<()>;

    async fn send_keys(&self, locator: &Locator, keys: &str) -> E2eResult<()>;

    async fn current_url(&self) -> E2eResult<String>;
}

/// Headless Chrome session over WebDriver
pub struct BrowserSession {
    driver: Option<WebDriver>,
    process: DriverProcess,
    wait_timeout: Duration,
    poll_interval: Duration,
}

impl BrowserSession {
    /// Start the driver process and open a browser session
    pub async fn open(config: &BrowserConfig) -> E2eResult<Self> {
        let process = DriverProcess::spawn(config).await?;
        let caps = chrome_capabilities(config)?;

        let driver = WebDriver::new(process.url(), caps).await?;
        info!(
            "Browser session opened ({}x{}, headless: {})",
            config.window_width, config.window_height, config.headless
        );

        Ok(Self {
            driver: Some(driver),
            process,
            wait_timeout: config.wait_timeout(),
            poll_interval: config.poll_interval(),
        })
    }

    /// Quit the browser and stop the driver process
    pub async fn close(mut self) -> E2eResult<()> {
        let result = match self.driver.take() {
            Some(driver) => driver.quit().await.map_err(E2eError::from),
            None => Ok(()),
        };
        self.process.shutdown().await;
        debug!("Browser session closed");
        result
    }

    fn driver(&self) -> E2eResult<&WebDriver> {
        self.driver
            .as_ref()
            .ok_or_else(|| E2eError::DriverStartup("browser session already closed".to_string()))
    }

    async fn element(&self, locator: &Locator) -> E2eResult<WebElement> {
        self.driver()?
            .find(locator.by())
            .await
            .map_err(|_| E2eError::ElementMissing(locator.to_string()))
    }
}

#[async_trait]
impl PageDriver for BrowserSession {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        debug!("navigate: {}", url);
        self.driver()?.goto(url).await?;
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator) -> E2eResult<()> {
        debug!("wait: {}", locator);
        let driver = self.driver()?;
        poll_until(
            &locator.to_string(),
            self.wait_timeout,
            self.poll_interval,
            || {
                let by = locator.by();
                async move { driver.find(by).await.ok().map(|_| ()) }
            },
        )
        .await
    }

    async fn text(&self, locator: &Locator) -> E2eResult<String> {
        Ok(self.element(locator).await?.text().await?)
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        debug!("click: {}", locator);
        self.element(locator).await?.click().await?;
        Ok(())
    }

    async fn send_keys(&self, locator: &Locator, keys: &str) -> E2eResult<()> {
        debug!("send_keys: {}", locator);
        self.element(locator).await?.send_keys(keys).await?;
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        Ok(self.driver()?.current_url().await?.to_string())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Reached only when `close` was skipped; the driver process going
        // away takes its browser with it.
        if self.driver.is_some() {
            warn!("Browser session dropped without close; stopping driver");
        }
    }
}

fn chrome_capabilities(config: &BrowserConfig) -> E2eResult<ChromeCapabilities> {
    let mut caps = DesiredCapabilities::chrome();
    if config.headless {
        caps.add_arg("--headless=new")?;
    }
    caps.add_arg(&config.window_size_arg())?;
    caps.add_arg("--disable-gpu")?;
    caps.add_arg("--no-sandbox")?;
    caps.add_arg("--disable-dev-shm-usage")?;

    if let Some(bin) = &config.chrome_bin {
        caps.set_binary(&bin.to_string_lossy())?;
    }
    Ok(caps)
}

/// Run `body` against a fresh browser session, closing it on every exit path.
///
/// An error from `body` takes precedence over an error while closing.
pub async fn with_session<T, F>(config: &BrowserConfig, body: F) -> E2eResult<T>
where
    F: for<'a> FnOnce(&'a BrowserSession) -> BoxFuture<'a, E2eResult<T>>,
{
    let session = BrowserSession::open(config).await?;
    scoped(session, body, |session| session.close()).await
}

/// Run `body` against `resource`, then always hand it to `cleanup`
pub async fn scoped<R, T, F, C, CFut>(resource: R, body: F, cleanup: C) -> E2eResult<T>
where
    F: for<'a> FnOnce(&'a R) -> BoxFuture<'a, E2eResult<T>>,
    C: FnOnce(R) -> CFut,
    CFut: Future<Output = E2eResult<()>>,
{
    let result = body(&resource).await;
    let closed = cleanup(resource).await;

    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!("Cleanup failed after error: {}", close_err);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::id("sessionId").to_string(), "#sessionId");
        assert_eq!(
            Locator::class("SubmitButton--complete").to_string(),
            ".SubmitButton--complete"
        );
    }

    #[test]
    fn test_chrome_capabilities_args() {
        let config = BrowserConfig {
            chrome_bin: Some("/opt/chrome/chrome".into()),
            ..Default::default()
        };
        let caps = chrome_capabilities(&config).unwrap();
        let json = format!("{:?}", caps);
        for arg in [
            "--headless=new",
            "--window-size=1920,1080",
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "/opt/chrome/chrome",
        ] {
            assert!(json.contains(arg), "missing {arg} in {json}");
        }
    }

    #[tokio::test]
    async fn test_scoped_cleans_up_on_failure() {
        let cleaned = Arc::new(AtomicBool::new(false));
        let flag = cleaned.clone();

        let result: E2eResult<()> = scoped(
            7u32,
            |_n| async { Err(E2eError::AssertionFailed("boom".to_string())) }.boxed(),
            move |_n| async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert!(result.unwrap_err().is_assertion());
        assert!(cleaned.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_scoped_reports_cleanup_error_on_success() {
        let result = scoped(
            1u32,
            |n| {
                let v = *n;
                async move { Ok(v + 1) }.boxed()
            },
            |_n| async { Err(E2eError::DriverStartup("quit failed".to_string())) },
        )
        .await;

        assert!(matches!(result, Err(E2eError::DriverStartup(_))));
    }
}
