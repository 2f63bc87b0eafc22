// src/infra/errors.rs - Error types for the Dojo client

use thiserror::Error;

/// Status reported for timeouts and caller aborts on the streaming path.
pub const TIMEOUT_STATUS: u16 = 408;

#[derive(Error, Debug)]
pub enum DojoError {
    // Backend answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        code: Option<String>,
    },

    // Connection refused/reset, body read failure
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("{message}")]
    Timeout { message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Malformed push message: {0}")]
    Parse(#[from] serde_json::Error),

    // Outbound payload could not be serialized
    #[error("Failed to encode request: {0}")]
    Encode(String),

    #[error("WebSocket error on '{scope}': {message}")]
    WebSocket { scope: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DojoError {
    /// HTTP-like status for this error, if it has one.
    pub fn status(&self) -> Option<u16> {
        match self {
            DojoError::Http { status, .. } => Some(*status),
            DojoError::Timeout { .. } => Some(TIMEOUT_STATUS),
            _ => None,
        }
    }

    /// Machine-readable code sent by the backend alongside an HTTP failure.
    pub fn code(&self) -> Option<&str> {
        match self {
            DojoError::Http { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Whether a streaming attempt that failed with this error may be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            DojoError::Network { .. } => true,
            DojoError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for DojoError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return DojoError::Http {
                status: status.as_u16(),
                message: e.to_string(),
                code: None,
            };
        }
        if e.is_decode() {
            return DojoError::Decode(e.to_string());
        }
        if e.is_builder() {
            return DojoError::Encode(e.to_string());
        }
        DojoError::Network {
            message: e.to_string(),
        }
    }
}
