use std::time::Duration;
use thiserror::Error;

/// Coarse error category used for retry decisions.
///
/// Retryability is a first-class property of an error value: `RetryPolicy`
/// consults the kind of each failure instead of matching on concrete error
/// types, so callers can whitelist exactly the categories they want retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad or unsafe input, rejected locally before any network call.
    Validation,
    /// Remote 429; the provider asked us to slow down.
    RateLimited,
    /// Network or polling timeout.
    Timeout,
    /// Remote 4xx other than 429. The request itself is wrong; retrying
    /// the same payload cannot succeed.
    Api,
    /// Remote 5xx. Transient on the provider side.
    Server,
    /// Remote content-safety rejection.
    Moderation,
    /// Cache layer failure. Non-fatal: the cache degrades to miss behavior.
    Cache,
    /// Connection-level failure (DNS, TLS, reset).
    Transport,
    /// Payload could not be encoded or decoded.
    Serialization,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Api => "api",
            ErrorKind::Server => "server",
            ErrorKind::Moderation => "moderation",
            ErrorKind::Cache => "cache",
            ErrorKind::Transport => "transport",
            ErrorKind::Serialization => "serialization",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the generation core.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("rate limited by provider: {message}")]
    RateLimited {
        message: String,
        /// Provider-supplied Retry-After, when present.
        retry_after: Option<Duration>,
    },

    #[error("{operation} timed out after {elapsed:?}")]
    Timeout { operation: String, elapsed: Duration },

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("content moderation rejected the request: {message}")]
    Moderation { message: String },

    #[error("cache error: {0}")]
    Cache(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, elapsed: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            elapsed,
        }
    }

    /// Classify a remote HTTP failure into the taxonomy.
    ///
    /// 429 maps to `RateLimited`, other 4xx to `Api`, 5xx to `Server`.
    /// Moderation rejections are detected by the transport layer from the
    /// provider error code and constructed directly.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => Error::RateLimited {
                message,
                retry_after: None,
            },
            s if s >= 500 => Error::Server { status, message },
            _ => Error::Api { status, message },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::Validation,
            Error::RateLimited { .. } => ErrorKind::RateLimited,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Api { .. } => ErrorKind::Api,
            Error::Server { .. } => ErrorKind::Server,
            Error::Moderation { .. } => ErrorKind::Moderation,
            Error::Cache(_) => ErrorKind::Cache,
            Error::Transport(_) => ErrorKind::Transport,
            Error::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Whether the default retry whitelist covers this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RateLimited | ErrorKind::Timeout | ErrorKind::Server | ErrorKind::Transport
        )
    }

    /// Provider backoff hint, when one was supplied.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout {
                operation: "http request".to_string(),
                elapsed: Duration::ZERO,
            }
        } else {
            Error::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            Error::from_status(429, "slow down").kind(),
            ErrorKind::RateLimited
        );
        assert_eq!(Error::from_status(400, "bad request").kind(), ErrorKind::Api);
        assert_eq!(Error::from_status(404, "not found").kind(), ErrorKind::Api);
        assert_eq!(Error::from_status(500, "boom").kind(), ErrorKind::Server);
        assert_eq!(Error::from_status(503, "overloaded").kind(), ErrorKind::Server);
    }

    #[test]
    fn test_retryability_follows_kind() {
        assert!(Error::from_status(429, "").is_retryable());
        assert!(Error::from_status(500, "").is_retryable());
        assert!(Error::timeout("poll", Duration::from_secs(1)).is_retryable());
        assert!(Error::Transport("reset".into()).is_retryable());

        assert!(!Error::from_status(400, "").is_retryable());
        assert!(!Error::validation("empty input").is_retryable());
        assert!(!Error::Moderation {
            message: "nope".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_retry_after_only_on_rate_limit() {
        let e = Error::RateLimited {
            message: "429".into(),
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(e.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(Error::from_status(500, "").retry_after(), None);
    }
}
