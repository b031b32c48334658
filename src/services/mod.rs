//! Clients for the external services: exchange-rate lookup and transactional email.
//!
//! Neither is allowed to fail a user-facing operation. Callers get a safe default
//! and the failure goes to the log.

pub mod exchange;
pub mod email;

use std::time::Duration;
use thiserror::Error;

/// Timeout applied to every outbound HTTP request
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Parse(String),
    #[error("server returned {0}")]
    Server(String),
}

pub(crate) fn http_client() -> Result<reqwest::blocking::Client, ApiError> {
    reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("bao/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ApiError::Network(e.to_string()))
}

pub use exchange::*;
pub use email::*;
