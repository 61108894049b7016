//! Request template building blocks.
//!
//! A request document stores its method, URL template, ordered parameter and
//! header lists, and body. All text fields may contain `{{variable}}` tokens
//! that are resolved immediately before dispatch.

use serde::{Deserialize, Serialize};

/// HTTP request method.
///
/// Represents the standard HTTP methods as defined in RFC 7231 and RFC 5789.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// HTTP GET method - retrieve a resource
    GET,
    /// HTTP POST method - submit data to create a resource
    POST,
    /// HTTP PUT method - replace a resource
    PUT,
    /// HTTP DELETE method - remove a resource
    DELETE,
    /// HTTP PATCH method - partially modify a resource
    PATCH,
    /// HTTP OPTIONS method - describe communication options
    OPTIONS,
    /// HTTP HEAD method - retrieve headers only
    HEAD,
}

impl HttpMethod {
    /// Returns the string representation of the HTTP method.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::OPTIONS => "OPTIONS",
            HttpMethod::HEAD => "HEAD",
        }
    }

    /// Parses a string into an HttpMethod, case-insensitively.
    ///
    /// # Returns
    ///
    /// `Some(HttpMethod)` if the string is a recognized method, `None` otherwise.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "DELETE" => Some(HttpMethod::DELETE),
            "PATCH" => Some(HttpMethod::PATCH),
            "OPTIONS" => Some(HttpMethod::OPTIONS),
            "HEAD" => Some(HttpMethod::HEAD),
            _ => None,
        }
    }
}

impl Default for HttpMethod {
    fn default() -> Self {
        HttpMethod::GET
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An ordered key/value entry used for query parameters, headers, and
/// urlencoded body pairs.
///
/// Disabled entries are kept in the document (so the editing layer can toggle
/// them back on) but are dropped entirely from the resolved request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
    /// Whether this entry participates in the resolved request. Defaults to true.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl KeyValuePair {
    /// Creates an enabled key/value pair.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Creates a disabled key/value pair.
    pub fn disabled(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: false,
        }
    }
}

/// Body mode of a request template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyMode {
    /// No body is sent.
    None,
    /// The raw template text is sent as-is after variable resolution.
    Raw,
    /// Enabled urlencoded pairs are joined as `key=value&...`.
    Urlencoded,
}

impl Default for BodyMode {
    fn default() -> Self {
        BodyMode::None
    }
}

/// Request body template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub mode: BodyMode,

    /// Raw body template text, used when `mode` is `Raw`.
    #[serde(default)]
    pub raw: String,

    /// Ordered urlencoded pairs, used when `mode` is `Urlencoded`.
    #[serde(default)]
    pub urlencoded: Vec<KeyValuePair>,
}

impl RequestBody {
    /// Creates a raw-mode body with the given template text.
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            mode: BodyMode::Raw,
            raw: text.into(),
            urlencoded: Vec::new(),
        }
    }

    /// Creates a urlencoded-mode body with the given pairs.
    pub fn urlencoded(pairs: Vec<KeyValuePair>) -> Self {
        Self {
            mode: BodyMode::Urlencoded,
            raw: String::new(),
            urlencoded: pairs,
        }
    }
}
