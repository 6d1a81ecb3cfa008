//! Configuration error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading client configuration
#[derive(Error, Debug)]
pub enum Error {
    /// A required setting such as `client_id` or `account` is blank
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// An endpoint override that MAL requests cannot be sent to
    #[error("{field} must start with http:// or https://, got: {url}")]
    InvalidBaseUrl { field: &'static str, url: String },

    #[error("failed to read password_file {}: {source}", path.display())]
    PasswordFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;
