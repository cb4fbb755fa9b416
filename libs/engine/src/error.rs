//! Error types for the expansion engine

use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(
        "Unsupported rule {rule}: operator '{operator}' on property '{property}' is not defined for {terminology}"
    )]
    UnsupportedRule {
        rule: Uuid,
        terminology: String,
        property: String,
        operator: String,
    },

    #[error("Terminology '{terminology}' has exclude rules but no include rule")]
    MissingIncludeRule { terminology: String },

    #[error("Terminology service error: {0}")]
    TerminologyService(#[from] lexicon_ecl_client::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Whether the failed expansion may succeed when attempted again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::TerminologyService(e) => e.is_retryable(),
            Error::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed
            ),
            _ => false,
        }
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Database(_) | Error::Migration(_) => "database",
            Error::NotFound(_) => "not_found",
            Error::Validation(_) => "validation",
            Error::UnsupportedRule { .. } => "unsupported_rule",
            Error::MissingIncludeRule { .. } => "missing_include_rule",
            Error::TerminologyService(_) => "terminology_service",
            Error::Config(_) => "config",
            Error::Other(_) => "internal",
        }
    }
}

impl From<::config::ConfigError> for Error {
    fn from(err: ::config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminology_service_failures_keep_retryability() {
        let retryable = Error::TerminologyService(lexicon_ecl_client::Error::Status {
            status: 502,
            url: "http://snowstorm/MAIN/concepts".to_string(),
        });
        assert!(retryable.is_retryable());
        assert_eq!(retryable.kind(), "terminology_service");

        let permanent = Error::TerminologyService(lexicon_ecl_client::Error::MalformedResponse(
            "missing items".to_string(),
        ));
        assert!(!permanent.is_retryable());
    }

    #[test]
    fn authoring_errors_are_not_retryable() {
        let err = Error::MissingIncludeRule {
            terminology: "RxNorm".to_string(),
        };
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Terminology 'RxNorm' has exclude rules but no include rule"
        );
    }
}
