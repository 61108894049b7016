//! Native HTTP transport using reqwest.

use crate::models::HttpMethod;
use crate::transport::{HttpTransport, TransportError, TransportOptions, TransportRequest, TransportResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;

/// The production [`HttpTransport`] implementation.
///
/// Builds a reqwest client per dispatch so the timeout and TLS-verification
/// options can differ between runs without shared mutable state.
#[derive(Debug, Clone, Default)]
pub struct NativeTransport;

impl NativeTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HttpTransport for NativeTransport {
    async fn send(
        &self,
        request: &TransportRequest,
        options: &TransportOptions,
    ) -> Result<TransportResponse, TransportError> {
        validate_url(&request.url)?;

        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(!options.verify_tls)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        let method = match request.method {
            HttpMethod::GET => reqwest::Method::GET,
            HttpMethod::POST => reqwest::Method::POST,
            HttpMethod::PUT => reqwest::Method::PUT,
            HttpMethod::DELETE => reqwest::Method::DELETE,
            HttpMethod::PATCH => reqwest::Method::PATCH,
            HttpMethod::OPTIONS => reqwest::Method::OPTIONS,
            HttpMethod::HEAD => reqwest::Method::HEAD,
        };

        let mut builder = client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(TransportError::from)?;

        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value_str) = value.to_str() {
                headers.insert(name.as_str().to_string(), value_str.to_string());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?
            .to_vec();
        let elapsed = started.elapsed();

        log::debug!(
            "{} {} -> {} ({} bytes, {:?})",
            request.method,
            request.url,
            status,
            body.len(),
            elapsed
        );

        Ok(TransportResponse {
            status,
            headers,
            body,
            elapsed,
        })
    }
}

/// Validates that the URL is well-formed and uses a supported protocol.
fn validate_url(url: &str) -> Result<(), TransportError> {
    let parsed = url::Url::parse(url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(TransportError::UnsupportedProtocol(format!(
            "Only HTTP and HTTPS are supported, got: {}",
            scheme
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_valid() {
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("https://api.example.com/v1/users").is_ok());
        assert!(validate_url("http://example.com:8080").is_ok());
    }

    #[test]
    fn test_validate_url_invalid() {
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("").is_err());
        assert!(validate_url("://missing-scheme").is_err());
    }

    #[test]
    fn test_validate_url_unsupported_protocol() {
        let result = validate_url("ftp://example.com");
        match result {
            Err(TransportError::UnsupportedProtocol(msg)) => assert!(msg.contains("ftp")),
            other => panic!("Expected UnsupportedProtocol error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_network_error() {
        let transport = NativeTransport::new();
        let request = TransportRequest {
            url: "http://127.0.0.1:1/unreachable".to_string(),
            ..Default::default()
        };

        let result = transport.send(&request, &TransportOptions::default()).await;
        assert!(matches!(result, Err(TransportError::Network(_))));
    }
}
