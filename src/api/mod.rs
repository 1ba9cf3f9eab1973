use serde_json::{json, Value};
use thiserror::Error;

pub mod lifi;

pub use lifi::{LiFiClient, UpstreamResponse};

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Error from Li.Fi API: {status} {status_text}")]
    Upstream {
        status: u16,
        status_text: String,
        detail: String,
    },
    #[error("Network error when connecting to Li.Fi API")]
    Connection(String),
    #[error("Request to Li.Fi API timed out")]
    Timeout,
    #[error("Failed to fetch from Li.Fi API")]
    Internal(String),
}

impl ProxyError {
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::BadRequest(_) => 400,
            ProxyError::Upstream { status, .. } => *status,
            ProxyError::Connection(_) => 503,
            ProxyError::Timeout => 504,
            ProxyError::Internal(_) => 500,
        }
    }

    pub fn detail(&self) -> Option<String> {
        match self {
            ProxyError::BadRequest(_) => None,
            ProxyError::Upstream { detail, .. } => Some(detail.clone()),
            ProxyError::Connection(msg) | ProxyError::Internal(msg) => Some(msg.clone()),
            ProxyError::Timeout => Some("The request took too long to complete".to_string()),
        }
    }

    /// JSON body returned to the browser.
    pub fn body(&self) -> Value {
        match self.detail() {
            Some(detail) => json!({ "error": self.to_string(), "detail": detail }),
            None => json!({ "error": self.to_string() }),
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProxyError::Timeout
        } else if err.is_connect() || err.is_request() {
            ProxyError::Connection(err.to_string())
        } else {
            ProxyError::Internal(err.to_string())
        }
    }
}
