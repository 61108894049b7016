//! Response snapshot exposed to post-request scripts and returned to callers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A fully-buffered HTTP response snapshot.
///
/// This is the shape handed to post-request scripts (`pm.response`) and
/// returned in the execution result. A transport-level failure never reaches
/// the caller as an error; it is converted into the synthetic form produced
/// by [`ResponseData::synthetic`], so the pipeline always carries a response
/// past the dispatch stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    /// HTTP status code. Zero marks a synthetic response for a failed dispatch.
    pub status: u16,

    /// Response headers as key-value pairs.
    pub headers: HashMap<String, String>,

    /// Response body decoded as UTF-8 text (lossy for binary bodies).
    pub body_text: String,

    /// Response body parsed as JSON, when it parses.
    pub body_json: Option<serde_json::Value>,

    /// Wall-clock time of the exchange in milliseconds. Zero for synthetic
    /// responses.
    pub elapsed_ms: f64,
}

impl ResponseData {
    /// Builds the synthetic stand-in for a transport-level failure: status 0,
    /// no headers, and the failure description as the body text.
    pub fn synthetic(message: impl Into<String>) -> Self {
        Self {
            status: 0,
            headers: HashMap::new(),
            body_text: message.into(),
            body_json: None,
            elapsed_ms: 0.0,
        }
    }

    /// Whether this snapshot stands in for a failed dispatch.
    pub fn is_synthetic(&self) -> bool {
        self.status == 0
    }
}
