#![forbid(unsafe_code)]

//! Common error type for flowprobe crates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// I/O related failures.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing failures.
    #[error("Config parse error: {0}")]
    ConfigParse(toml::de::Error),
}

/// Convenient alias for results throughout flowprobe crates.
pub type Result<T> = std::result::Result<T, Error>;
