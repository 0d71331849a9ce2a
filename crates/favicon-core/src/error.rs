//! Error types for favicon-core operations.
//!
//! Resolution itself never fails: the discovery stages log these errors and
//! degrade to an empty candidate list. The [`Error`] type surfaces where a
//! caller can act on it, namely when building the HTTP client, when loading
//! [`ResolutionOptions`](crate::ResolutionOptions) from TOML, and at the
//! [`Transport`](crate::Transport) seam for custom transports.
//!
//! ```rust
//! use favicon_core::Error;
//!
//! let err = Error::Timeout("https://example.com/favicon.ico".to_string());
//! assert!(err.is_recoverable());
//! assert_eq!(err.category(), "timeout");
//! ```

use thiserror::Error;

/// The main error type for favicon-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Network operation failed.
    ///
    /// The underlying `reqwest::Error` is preserved so callers can inspect
    /// whether it was a connect, timeout or decode failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Request exceeded its configured timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// URL is malformed or cannot be resolved.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Options are invalid or inaccessible.
    ///
    /// ## Common Causes
    ///
    /// - Invalid TOML syntax in an options file
    /// - Header names or values that are not valid HTTP tokens
    /// - Options file cannot be read
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error for uncategorized failures.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Check if the error might be recoverable by trying again later.
    ///
    /// Timeouts and connection failures are transient; malformed URLs and
    /// invalid configuration are not.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout(_) => true,
            _ => false,
        }
    }

    /// Get the error category as a string identifier, for logging.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Config(_) => "config",
            Self::Other(_) => "other",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        let cases = vec![
            (Error::Timeout("slow".to_string()), "Timeout: slow"),
            (
                Error::InvalidUrl("not a url".to_string()),
                "Invalid URL: not a url",
            ),
            (
                Error::Config("bad header".to_string()),
                "Configuration error: bad header",
            ),
            (Error::Other("odd".to_string()), "odd"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_recoverability() {
        assert!(Error::Timeout("t".to_string()).is_recoverable());
        assert!(!Error::InvalidUrl("u".to_string()).is_recoverable());
        assert!(!Error::Config("c".to_string()).is_recoverable());
        assert!(!Error::Other("o".to_string()).is_recoverable());
    }

    #[test]
    fn test_categories() {
        assert_eq!(Error::Timeout(String::new()).category(), "timeout");
        assert_eq!(Error::InvalidUrl(String::new()).category(), "invalid_url");
        assert_eq!(Error::Config(String::new()).category(), "config");
        assert_eq!(Error::Other(String::new()).category(), "other");
    }

    #[test]
    fn test_malformed_options_report_as_config() {
        let err = crate::ResolutionOptions::from_toml_str("= broken").unwrap_err();
        assert!(matches!(err, Error::Config(_)), "unexpected: {err}");
        assert!(!err.is_recoverable());
    }
}
