//! Error types for the Spoonacular API client.

use std::time::Duration;

/// Terminal failure of a logical request.
///
/// Cloneable so a single outcome can be handed to every caller coalesced on
/// the same in-flight request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP error! status: {status} ({url})")]
    HttpStatus { status: u16, url: String },
    #[error("failed to parse response from {url}: {message}")]
    Parse { url: String, message: String },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Transport failures, timeouts and 5xx responses are transient; malformed
    /// requests, 4xx responses and unparseable bodies are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout(_) => true,
            FetchError::HttpStatus { status, .. } => (500..600).contains(status),
            FetchError::InvalidRequest(_) | FetchError::Parse { .. } => false,
        }
    }

    /// HTTP status code, if the failure was a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for the error panel.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::InvalidRequest(_) => {
                "That search couldn't be understood. Please try different terms.".to_owned()
            }
            // Spoonacular answers 402 once the daily point quota is spent.
            FetchError::HttpStatus { status: 402, .. } => {
                "The daily recipe quota has been used up. Please try again tomorrow.".to_owned()
            }
            _ => "Failed to fetch recipes. Please try again later.".to_owned(),
        }
    }
}
