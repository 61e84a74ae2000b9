//! Error types for acceptance runs

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Source file not found: {}", path.display())]
    SourceMissing { path: PathBuf },

    #[error("Browser driver failed to start: {0}")]
    DriverStartup(String),

    #[error("Browser driver health check failed after {0} attempts")]
    DriverHealthCheck(usize),

    #[error("No case named '{0}'")]
    UnknownCase(String),

    #[error("Checkout button id not found in order page")]
    ButtonNotFound,

    #[error("Timeout after {seconds}s waiting for: {what}")]
    Timeout { what: String, seconds: u64 },

    #[error("Element not found: {0}")]
    ElementMissing(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Unexpected response from {url}: HTTP {status}")]
    UnexpectedResponse { url: String, status: u16 },

    #[error(transparent)]
    Common(#[from] cartcheck_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebDriver error: {0}")]
    WebDriver(#[from] thirtyfour::error::WebDriverError),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl E2eError {
    /// Whether this error is a failed expectation rather than a broken environment
    pub fn is_assertion(&self) -> bool {
        matches!(self, E2eError::AssertionFailed(_))
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
