//! cartcheck Common Library
//!
//! Configuration, error types and the payment records shared by the
//! acceptance harness and its CLI.

pub mod config;
pub mod error;
pub mod money;
pub mod types;

pub use config::{AppConfig, BrowserConfig, HarnessConfig, ProviderConfig, SourcesConfig};
pub use error::{Error, Result};
pub use money::parse_minor_units;
pub use types::*;

/// cartcheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "cartcheck.toml";
