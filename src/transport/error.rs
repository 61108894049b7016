//! Transport error types.
//!
//! These never reach the pipeline caller as errors: the orchestrator (and the
//! sandbox replay bridge) convert every transport failure into a synthetic
//! status-0 response so later stages still run.

use std::fmt;

/// Errors that can occur while dispatching an HTTP request.
#[derive(Debug)]
pub enum TransportError {
    /// Connection failures, DNS resolution errors, and other network-level
    /// issues.
    Network(String),

    /// The request exceeded the configured timeout.
    Timeout,

    /// The URL could not be parsed or is malformed.
    InvalidUrl(String),

    /// Only HTTP and HTTPS are supported.
    UnsupportedProtocol(String),

    /// Certificate validation errors, handshake failures, and other
    /// TLS-related issues.
    Tls(String),

    /// The request could not be constructed.
    Build(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Network(msg) => write!(f, "Network error: {}", msg),
            TransportError::Timeout => write!(f, "Request timed out"),
            TransportError::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            TransportError::UnsupportedProtocol(protocol) => {
                write!(f, "Unsupported protocol: {}", protocol)
            }
            TransportError::Tls(msg) => write!(f, "TLS/SSL error: {}", msg),
            TransportError::Build(msg) => write!(f, "Request build error: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// Maps reqwest's error types to our variants for consistent reporting.
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_builder() {
            TransportError::Build(err.to_string())
        } else if err.to_string().contains("certificate")
            || err.to_string().contains("TLS")
            || err.to_string().contains("SSL")
        {
            TransportError::Tls(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        TransportError::InvalidUrl(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::Network("Connection refused".to_string());
        assert_eq!(format!("{}", err), "Network error: Connection refused");

        assert_eq!(format!("{}", TransportError::Timeout), "Request timed out");

        let err = TransportError::InvalidUrl("not a url".to_string());
        assert_eq!(format!("{}", err), "Invalid URL: not a url");

        let err = TransportError::UnsupportedProtocol("ftp".to_string());
        assert_eq!(format!("{}", err), "Unsupported protocol: ftp");
    }

    #[test]
    fn test_error_is_error_trait() {
        let err: &dyn std::error::Error = &TransportError::Timeout;
        assert_eq!(format!("{}", err), "Request timed out");
    }

    #[test]
    fn test_from_url_parse_error() {
        let parse_err = url::Url::parse("not a url").unwrap_err();
        let err = TransportError::from(parse_err);
        assert!(matches!(err, TransportError::InvalidUrl(_)));
    }
}
