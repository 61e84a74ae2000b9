//! Error types for cartcheck

use thiserror::Error;

/// Result type alias using cartcheck Error
pub type Result<T> = std::result::Result<T, Error>;

/// cartcheck error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing setting: {name}")]
    MissingSetting { name: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl Error {
    pub fn missing(name: impl Into<String>) -> Self {
        Error::MissingSetting { name: name.into() }
    }
}
