//! Error types for the binding engine.
//!
//! Only setup can fail: parsing the markup, loading configuration and
//! managing the global instance. Query and mutation calls never return an
//! error; they degrade to a no-op and a diagnostic instead.

use std::path::PathBuf;

use tripled_core::DomError;

/// Result type alias for engine setup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while setting up the binding engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The rendered tree rejected an operation or the markup did not parse.
    #[error("document error: {0}")]
    Dom(#[from] DomError),

    /// The configuration file could not be read.
    #[error("failed to read config '{path}': {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or has the wrong shape.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration parsed but holds an unusable value.
    #[error("invalid config value for '{field}': {message}")]
    InvalidConfig { field: &'static str, message: String },

    /// The global engine has already been installed.
    #[error("the global engine is already initialized")]
    AlreadyInitialized,

    /// The global engine has not been installed yet.
    #[error("the global engine is not initialized; call bootstrap() first")]
    NotInitialized,
}

impl Error {
    /// Create a config I/O error.
    pub fn config_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigIo {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid config value error.
    pub fn invalid_config(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            message: message.into(),
        }
    }
}
