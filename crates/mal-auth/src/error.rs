//! Error types for MAL authentication and API calls

use serde_json::Value;

/// Errors from transport, token and session operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("response body is not JSON: {0}")]
    Decode(String),

    #[error("token endpoint returned {status}: {body}")]
    TokenExchange { status: u16, body: Value },

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("session has no token: {0}")]
    NoToken(&'static str),

    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: Value },

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl Error {
    /// HTTP status returned by the upstream, for token and API failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::TokenExchange { status, .. } | Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Decoded upstream error body, for token and API failures.
    pub fn body(&self) -> Option<&Value> {
        match self {
            Error::TokenExchange { body, .. } | Error::Api { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Whether the upstream rejected the credentials (401). Callers usually
    /// respond by starting a fresh login flow.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
