//! Error types for ecl-client

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Terminology server client errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Terminology server returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Malformed terminology server response: {0}")]
    MalformedResponse(String),

    #[error("Invalid client configuration: {0}")]
    Configuration(String),
}

impl Error {
    /// Whether repeating the same request may succeed.
    ///
    /// Transport failures, timeouts, throttling and server-side errors are
    /// retryable. Client errors and undecodable payloads are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::Status { status, .. } => *status == 429 || *status >= 500,
            Error::MalformedResponse(_) | Error::Configuration(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable() {
        let err = Error::Status {
            status: 503,
            url: "http://localhost/concepts".to_string(),
        };
        assert!(err.is_retryable());

        let err = Error::Status {
            status: 429,
            url: "http://localhost/concepts".to_string(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn client_errors_are_not_retryable() {
        let err = Error::Status {
            status: 400,
            url: "http://localhost/concepts".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(!Error::MalformedResponse("items".to_string()).is_retryable());
    }
}
