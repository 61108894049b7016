//! HTTP transport collaborator contract.
//!
//! The transport dispatches one fully-resolved request and returns the
//! buffered response. It is consumed from two places with the same contract:
//! the orchestrator's dispatch stage, and the sandbox's replay-phase bridge
//! for `pm.sendRequest`.

pub mod error;
pub mod native;

pub use error::TransportError;
pub use native::NativeTransport;

use crate::models::{HttpMethod, ResponseData};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// A fully-resolved request ready for dispatch. All variable substitution has
/// already happened.
#[derive(Debug, Clone, Default)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Enabled query parameters, in template order.
    pub query: Vec<(String, String)>,
    /// Enabled headers, in template order.
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// Per-dispatch options shared by the orchestrator and the replay bridge.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Whether to verify TLS certificates.
    pub verify_tls: bool,

    /// Total request timeout. No automatic retry happens on expiry.
    pub timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            verify_tls: true,
            timeout: Duration::from_secs(30),
        }
    }
}

/// A buffered HTTP response as produced by a transport.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub elapsed: Duration,
}

impl TransportResponse {
    /// Converts the raw response into the snapshot exposed to scripts and
    /// callers, decoding the body as text and opportunistically as JSON.
    pub fn into_response_data(self) -> ResponseData {
        let body_text = String::from_utf8_lossy(&self.body).into_owned();
        let body_json = serde_json::from_str(&body_text).ok();
        ResponseData {
            status: self.status,
            headers: self.headers,
            body_text,
            body_json,
            elapsed_ms: self.elapsed.as_secs_f64() * 1000.0,
        }
    }
}

/// Dispatches resolved HTTP requests.
///
/// Implementations must be usable concurrently from independent pipeline
/// runs.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends the request and returns the buffered response, or a
    /// [`TransportError`] for network-level failures.
    async fn send(
        &self,
        request: &TransportRequest,
        options: &TransportOptions,
    ) -> Result<TransportResponse, TransportError>;
}
