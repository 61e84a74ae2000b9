//! Harness configuration
//!
//! Values come from an optional TOML file and are then overlaid with
//! environment variables, so CI can inject the browser paths and the
//! provider secret without writing them to disk.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

pub const ENV_BASE_URL: &str = "CHECKOUT_BASE_URL";
pub const ENV_ORDER_HTML: &str = "ORDER_HTML_PATH";
pub const ENV_BACKEND_SOURCE: &str = "BACKEND_SOURCE_PATH";
pub const ENV_CHROME_BIN: &str = "CHROME_BIN";
pub const ENV_CHROMEDRIVER_PATH: &str = "CHROMEDRIVER_PATH";
pub const ENV_PROVIDER_API_BASE: &str = "STRIPE_API_BASE";
pub const ENV_PROVIDER_SECRET: &str = "STRIPE_SECRET_KEY";

/// Top-level harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory for result files
    pub output_dir: PathBuf,

    /// Deployed application under test
    pub app: AppConfig,

    /// Source files read by the static checks
    pub sources: SourcesConfig,

    /// Browser and driver settings
    pub browser: BrowserConfig,

    /// Payment provider API access
    pub provider: ProviderConfig,
}

/// Application under test
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the deployed checkout demo
    pub base_url: Option<String>,
}

/// Locations of the two files the static checks read
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub order_html: PathBuf,
    pub backend: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            order_html: PathBuf::from("client/order.html"),
            backend: PathBuf::from("app.py"),
        }
    }
}

/// Browser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Chrome binary (None = let the driver locate it)
    pub chrome_bin: Option<PathBuf>,

    /// chromedriver binary
    pub chromedriver_path: PathBuf,

    /// Port for chromedriver (None = find a free port)
    pub driver_port: Option<u16>,

    pub window_width: u32,
    pub window_height: u32,
    pub headless: bool,

    /// Upper bound for every element wait
    pub wait_timeout_secs: u64,

    /// Interval between polls while waiting
    pub poll_interval_ms: u64,

    /// Upper bound for chromedriver to answer its status endpoint
    pub startup_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_bin: None,
            chromedriver_path: PathBuf::from("chromedriver"),
            driver_port: None,
            window_width: 1920,
            window_height: 1080,
            headless: true,
            wait_timeout_secs: 20,
            poll_interval_ms: 250,
            startup_timeout_secs: 30,
        }
    }
}

impl BrowserConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn window_size_arg(&self) -> String {
        format!("--window-size={},{}", self.window_width, self.window_height)
    }
}

/// Payment provider API access
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Root of the provider REST API
    pub api_base: String,

    /// Server-side secret; only ever taken from the environment
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.stripe.com".to_string(),
            secret_key: None,
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_base", &self.api_base)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let mut config: Self = toml::from_str(&content)?;
            if config.output_dir.as_os_str().is_empty() {
                config.output_dir = default_output_dir();
            }
            debug!("Loaded configuration from {}", path.display());
            Ok(config)
        } else {
            debug!("{} not found, using defaults", path.display());
            Ok(Self::with_defaults())
        }
    }

    /// Defaults with a populated output directory
    pub fn with_defaults() -> Self {
        Self {
            output_dir: default_output_dir(),
            ..Default::default()
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Overlay values from an arbitrary lookup; empty values are ignored
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_BASE_URL) {
            self.app.base_url = Some(v);
        }
        if let Some(v) = get(ENV_ORDER_HTML) {
            self.sources.order_html = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_BACKEND_SOURCE) {
            self.sources.backend = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_CHROME_BIN) {
            self.browser.chrome_bin = Some(PathBuf::from(v));
        }
        if let Some(v) = get(ENV_CHROMEDRIVER_PATH) {
            self.browser.chromedriver_path = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_PROVIDER_API_BASE) {
            self.provider.api_base = v;
        }
        if let Some(v) = get(ENV_PROVIDER_SECRET) {
            self.provider.secret_key = Some(v);
        }
    }

    /// Check the settings needed by the browser-driven cases
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        parse_http_url(&self.provider.api_base, "provider.api_base")?;

        if self.browser.wait_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "browser.wait_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.browser.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "browser.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.browser.window_width == 0 || self.browser.window_height == 0 {
            return Err(Error::InvalidConfig(
                "browser window size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL of the application under test
    pub fn base_url(&self) -> Result<Url> {
        let raw = self
            .app
            .base_url
            .as_deref()
            .ok_or_else(|| Error::missing(format!("app.base_url ({})", ENV_BASE_URL)))?;
        parse_http_url(raw, "app.base_url")
    }

    /// The `/payment_intent` sibling path exposing the last payment state
    pub fn payment_intent_url(&self) -> Result<Url> {
        Ok(join_path(&self.base_url()?, "payment_intent")?)
    }

    /// Provider endpoint for a single event
    pub fn provider_event_url(&self, event_id: &str) -> Result<Url> {
        let base = parse_http_url(&self.provider.api_base, "provider.api_base")?;
        let mut url = join_path(&base, "v1/events/")?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidConfig("provider.api_base cannot be a base".to_string()))?
            .pop_if_empty()
            .push(event_id);
        Ok(url)
    }

    /// Secret key for the provider API
    pub fn provider_secret(&self) -> Result<&str> {
        self.provider
            .secret_key
            .as_deref()
            .ok_or_else(|| Error::missing(ENV_PROVIDER_SECRET))
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("test-results")
}

fn parse_http_url(raw: &str, field: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::InvalidConfig(format!("{} is not a valid URL ({}): {}", field, e, raw)))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(Error::InvalidConfig(format!(
            "{} must be an absolute http(s) URL: {}",
            field, raw
        ))),
    }
}

/// Join a relative path onto a base, treating the base path as a directory
fn join_path(base: &Url, path: &str) -> std::result::Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    base.set_query(None);
    base.set_fragment(None);
    base.join(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::with_defaults();
        assert_eq!(config.sources.order_html, PathBuf::from("client/order.html"));
        assert_eq!(config.sources.backend, PathBuf::from("app.py"));
        assert_eq!(config.browser.wait_timeout_secs, 20);
        assert_eq!(config.browser.window_size_arg(), "--window-size=1920,1080");
        assert_eq!(config.output_dir, PathBuf::from("test-results"));
    }

    #[test]
    fn test_base_url_must_be_supplied() {
        let config = HarnessConfig::with_defaults();
        assert!(matches!(config.base_url(), Err(Error::MissingSetting { .. })));
    }

    #[test]
    fn test_unquoted_or_relative_url_rejected() {
        let mut config = HarnessConfig::with_defaults();
        config.app.base_url = Some("dry-shore-73297.herokuapp.com".to_string());
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        config.app.base_url = Some("ftp://example.com/".to_string());
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            (ENV_BASE_URL, "https://shop.example.com/"),
            (ENV_CHROME_BIN, "/opt/chrome/chrome"),
            (ENV_CHROMEDRIVER_PATH, "/opt/chrome/chromedriver"),
            (ENV_PROVIDER_SECRET, "sk_test_abc"),
            (ENV_ORDER_HTML, ""),
        ]);
        let mut config = HarnessConfig::with_defaults();
        config.apply_env_with(|k| vars.get(k).cloned());

        assert_eq!(config.app.base_url.as_deref(), Some("https://shop.example.com/"));
        assert_eq!(config.browser.chrome_bin, Some(PathBuf::from("/opt/chrome/chrome")));
        assert_eq!(
            config.browser.chromedriver_path,
            PathBuf::from("/opt/chrome/chromedriver")
        );
        assert_eq!(config.provider_secret().unwrap(), "sk_test_abc");
        // empty values leave the default alone
        assert_eq!(config.sources.order_html, PathBuf::from("client/order.html"));
    }

    #[test]
    fn test_payment_intent_url_with_and_without_trailing_slash() {
        let mut config = HarnessConfig::with_defaults();
        config.app.base_url = Some("https://shop.example.com/".to_string());
        assert_eq!(
            config.payment_intent_url().unwrap().as_str(),
            "https://shop.example.com/payment_intent"
        );

        config.app.base_url = Some("https://shop.example.com/demo".to_string());
        assert_eq!(
            config.payment_intent_url().unwrap().as_str(),
            "https://shop.example.com/demo/payment_intent"
        );
    }

    #[test]
    fn test_provider_event_url() {
        let mut config = HarnessConfig::with_defaults();
        assert_eq!(
            config.provider_event_url("evt_123").unwrap().as_str(),
            "https://api.stripe.com/v1/events/evt_123"
        );

        config.provider.api_base = "http://127.0.0.1:4010".to_string();
        assert_eq!(
            config.provider_event_url("pi_9").unwrap().as_str(),
            "http://127.0.0.1:4010/v1/events/pi_9"
        );
    }

    #[test]
    fn test_secret_redacted_and_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cartcheck.toml");

        let mut config = HarnessConfig::with_defaults();
        config.app.base_url = Some("https://shop.example.com/".to_string());
        config.provider.secret_key = Some("sk_test_supersecret".to_string());

        assert!(!format!("{:?}", config).contains("supersecret"));

        config.save(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("supersecret"));

        let loaded = HarnessConfig::load(&path).unwrap();
        assert_eq!(loaded.app.base_url, config.app.base_url);
        assert!(loaded.provider.secret_key.is_none());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.browser.window_height, 1080);
        assert_eq!(config.output_dir, PathBuf::from("test-results"));
    }

    #[test]
    fn test_partial_toml() {
        let config: HarnessConfig = toml::from_str(
            r#"
[app]
base_url = "https://shop.example.com/"

[browser]
wait_timeout_secs = 5
"#,
        )
        .unwrap();
        assert_eq!(config.browser.wait_timeout_secs, 5);
        assert_eq!(config.browser.window_width, 1920);
        assert!(config.validate().is_ok());
    }
}
