//! Sandboxed script execution.
//!
//! Evaluates one script body in an isolated QuickJS context against the
//! injected `pm` capability object, producing console output, a map of
//! variable writes, and an optional fatal error.
//!
//! Scripts call `pm.sendRequest` synchronously, but the scripting context has
//! no suspension capability and no native networking. The bridge is a
//! two-phase protocol:
//!
//! 1. **Probe phase**: the whole script runs once with `pm.sendRequest` wired
//!    to a no-I/O stub that records the arguments of its most recent
//!    invocation and returns a zero-value response. If the stub was never
//!    invoked, the probe result is final and no transport call happens — the
//!    overwhelmingly common path. Otherwise the probe output is discarded: it
//!    was computed against a fake response and cannot be trusted.
//! 2. **Replay phase**: the captured call is dispatched through the real
//!    transport, then a brand-new context re-runs the entire script with
//!    `pm.sendRequest` unconditionally returning that real response.
//!
//! Re-running from the top is the only way to deliver a value computed after
//! an external action to code whose evaluation model cannot pause
//! mid-statement. Only the most recent probe-phase call is replayed; scripts
//! that issue several distinct calls, or whose control flow differs between
//! the two runs, see the one bridged response everywhere. That approximation
//! is part of the protocol's contract.

mod preamble;

use crate::models::{HttpMethod, ResponseData};
use crate::transport::{HttpTransport, TransportOptions, TransportRequest};
use once_cell::sync::Lazy;
use regex::Regex;
use rquickjs::{CatchResultExt, Context, Runtime};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Memory ceiling for one evaluation context.
const MAX_SCRIPT_MEMORY: usize = 32 * 1024 * 1024;

/// QuickJS eval has no top-level await. Scripts written against async client
/// APIs are accepted by stripping the keyword; the calls they await are
/// synchronous here anyway.
static AWAIT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bawait\s+").expect("await pattern must compile"));

/// The observable side effects of one script evaluation.
///
/// A failed evaluation carries only `error`: no partial console or variable
/// output is ever returned from a failed run.
#[derive(Debug, Clone, Default)]
pub struct ScriptOutcome {
    /// Variable writes made through `pm.environment.set`, in key order.
    pub updates: BTreeMap<String, String>,

    /// Console lines, untagged. The orchestrator prefixes the chain level.
    pub console: Vec<String>,

    /// Fatal evaluation error, if any.
    pub error: Option<String>,
}

impl ScriptOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            updates: BTreeMap::new(),
            console: Vec::new(),
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PhaseResult {
    #[serde(default)]
    updates: BTreeMap<String, String>,
    #[serde(default)]
    console: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    result: PhaseResult,
    /// Arguments of the most recent `pm.sendRequest` call, or `None` when the
    /// primitive was never invoked.
    captured: Option<Value>,
}

/// Executes scripts in isolation and bridges their network calls out to the
/// real transport.
pub struct ScriptSandbox {
    transport: Arc<dyn HttpTransport>,
    options: TransportOptions,
}

impl ScriptSandbox {
    /// Creates a sandbox that bridges replay-phase calls through `transport`
    /// with the given dispatch options.
    pub fn new(transport: Arc<dyn HttpTransport>, options: TransportOptions) -> Self {
        Self { transport, options }
    }

    /// Runs a pre-request script against a variable snapshot.
    pub async fn run_pre(&self, script: &str, vars: &HashMap<String, String>) -> ScriptOutcome {
        self.execute(script, vars, None).await
    }

    /// Runs a post-request script against a variable snapshot and the
    /// response of the main dispatch.
    pub async fn run_post(
        &self,
        script: &str,
        vars: &HashMap<String, String>,
        response: &ResponseData,
    ) -> ScriptOutcome {
        self.execute(script, vars, Some(response)).await
    }

    async fn execute(
        &self,
        script: &str,
        vars: &HashMap<String, String>,
        response: Option<&ResponseData>,
    ) -> ScriptOutcome {
        if script.trim().is_empty() {
            return ScriptOutcome::default();
        }
        let script = AWAIT_REGEX.replace_all(script, "");

        let env_json = match serde_json::to_string(vars) {
            Ok(json) => json,
            Err(err) => return ScriptOutcome::failed(format!("variable snapshot: {}", err)),
        };
        let response_js = match response {
            Some(data) => match serde_json::to_string(data) {
                Ok(json) => json,
                Err(err) => return ScriptOutcome::failed(format!("response snapshot: {}", err)),
            },
            None => "undefined".to_string(),
        };

        // Probe phase: no I/O, capture whether (and how) the network
        // primitive was called.
        let probe = preamble::build_program(
            &env_json,
            &response_js,
            preamble::MOCK_SEND_REQUEST,
            &script,
            preamble::PROBE_SUFFIX,
        );
        let raw = match evaluate_blocking(probe).await {
            Ok(raw) => raw,
            Err(err) => return ScriptOutcome::failed(err),
        };
        let report: ProbeReport = match serde_json::from_str(&raw) {
            Ok(report) => report,
            Err(err) => return ScriptOutcome::failed(format!("malformed sandbox report: {}", err)),
        };

        let captured = match report.captured {
            Some(captured) => captured,
            // Common path: the script never touched the network.
            None => {
                return ScriptOutcome {
                    updates: report.result.updates,
                    console: report.result.console,
                    error: None,
                }
            }
        };

        // Replay phase: dispatch the captured call for real, then re-run the
        // whole script against the real response.
        log::debug!("script invoked sendRequest; entering replay phase");
        let bridged = match self
            .transport
            .send(&bridge_request(&captured), &self.options)
            .await
        {
            Ok(response) => response.into_response_data(),
            Err(err) => ResponseData::synthetic(err.to_string()),
        };
        let bridged_json = match serde_json::to_string(&bridged) {
            Ok(json) => json,
            Err(err) => return ScriptOutcome::failed(format!("bridged response: {}", err)),
        };

        let replay = preamble::build_program(
            &env_json,
            &response_js,
            &preamble::real_send_request(&bridged_json),
            &script,
            preamble::REPLAY_SUFFIX,
        );
        match evaluate_blocking(replay).await {
            Ok(raw) => match serde_json::from_str::<PhaseResult>(&raw) {
                Ok(result) => ScriptOutcome {
                    updates: result.updates,
                    console: result.console,
                    error: None,
                },
                Err(err) => ScriptOutcome::failed(format!("malformed sandbox report: {}", err)),
            },
            Err(err) => ScriptOutcome::failed(err),
        }
    }
}

/// Runs one evaluation on the blocking pool. Script evaluation cannot be
/// pre-empted once started, so it must not occupy an async worker thread.
async fn evaluate_blocking(source: String) -> Result<String, String> {
    match tokio::task::spawn_blocking(move || evaluate(&source)).await {
        Ok(result) => result,
        Err(err) => Err(format!("script evaluation task failed: {}", err)),
    }
}

/// Evaluates one program in a fresh, memory-limited context and returns its
/// completion value (a JSON string produced by the program suffix).
fn evaluate(source: &str) -> Result<String, String> {
    let runtime =
        Runtime::new().map_err(|e| format!("scripting engine unavailable: {}", e))?;
    runtime.set_memory_limit(MAX_SCRIPT_MEMORY);
    let context =
        Context::full(&runtime).map_err(|e| format!("scripting engine unavailable: {}", e))?;
    context.with(|ctx| {
        ctx.eval::<String, _>(source)
            .catch(&ctx)
            .map_err(|caught| caught.to_string())
    })
}

/// Builds the transport request described by captured `pm.sendRequest`
/// arguments: `{url, method, header: [{key, value}], body: {mode, ...}}`.
fn bridge_request(captured: &Value) -> TransportRequest {
    let method = captured
        .get("method")
        .and_then(Value::as_str)
        .and_then(HttpMethod::from_str)
        .unwrap_or(HttpMethod::GET);
    let url = captured
        .get("url")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let mut headers = Vec::new();
    if let Some(entries) = captured.get("header").and_then(Value::as_array) {
        for entry in entries {
            let key = entry.get("key").and_then(Value::as_str).unwrap_or("");
            let value = entry.get("value").and_then(Value::as_str).unwrap_or("");
            headers.push((key.to_string(), value.to_string()));
        }
    }

    let body = captured.get("body").and_then(|body| {
        match body.get("mode").and_then(Value::as_str).unwrap_or("none") {
            "raw" => Some(
                body.get("raw")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .as_bytes()
                    .to_vec(),
            ),
            "urlencoded" => {
                let pairs = body
                    .get("urlencoded")
                    .and_then(Value::as_array)
                    .map(|entries| {
                        entries
                            .iter()
                            .filter(|e| {
                                !e.get("disabled").and_then(Value::as_bool).unwrap_or(false)
                            })
                            .map(|e| {
                                format!(
                                    "{}={}",
                                    e.get("key").and_then(Value::as_str).unwrap_or(""),
                                    e.get("value").and_then(Value::as_str).unwrap_or("")
                                )
                            })
                            .collect::<Vec<_>>()
                            .join("&")
                    })
                    .unwrap_or_default();
                Some(pairs.into_bytes())
            }
            _ => None,
        }
    });

    TransportRequest {
        method,
        url,
        query: Vec::new(),
        headers,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{TransportError, TransportResponse};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts dispatches and returns a canned response.
    struct StubTransport {
        calls: AtomicUsize,
        status: u16,
        body: &'static str,
    }

    impl StubTransport {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                status,
                body,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for StubTransport {
        async fn send(
            &self,
            _request: &TransportRequest,
            _options: &TransportOptions,
        ) -> Result<TransportResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TransportResponse {
                status: self.status,
                headers: HashMap::new(),
                body: self.body.as_bytes().to_vec(),
                elapsed: Duration::from_millis(5),
            })
        }
    }

    /// Always fails with a connection error.
    struct RefusingTransport;

    #[async_trait]
    impl HttpTransport for RefusingTransport {
        async fn send(
            &self,
            _request: &TransportRequest,
            _options: &TransportOptions,
        ) -> Result<TransportResponse, TransportError> {
            Err(TransportError::Network("connection refused".to_string()))
        }
    }

    fn sandbox_with(transport: Arc<dyn HttpTransport>) -> ScriptSandbox {
        ScriptSandbox::new(transport, TransportOptions::default())
    }

    #[tokio::test]
    async fn test_set_and_log() {
        let transport = Arc::new(StubTransport::new(200, "{}"));
        let sandbox = sandbox_with(transport.clone());

        let script = r#"
            pm.environment.set('count', 1);
            console.log('hello', { nested: true });
        "#;
        let outcome = sandbox.run_pre(script, &HashMap::new()).await;

        assert!(outcome.error.is_none());
        assert_eq!(outcome.updates.get("count").unwrap(), "1");
        assert_eq!(outcome.console, vec![r#"hello {"nested":true}"#.to_string()]);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_environment_get_reads_snapshot() {
        let sandbox = sandbox_with(Arc::new(StubTransport::new(200, "{}")));
        let mut vars = HashMap::new();
        vars.insert("token".to_string(), "abc".to_string());

        let outcome = sandbox
            .run_pre("console.log(pm.environment.get('token'));", &vars)
            .await;
        assert_eq!(outcome.console, vec!["abc".to_string()]);
    }

    #[tokio::test]
    async fn test_writes_are_visible_to_later_reads_in_same_script() {
        let sandbox = sandbox_with(Arc::new(StubTransport::new(200, "{}")));
        let script = r#"
            pm.environment.set('a', 'x');
            console.log(pm.environment.get('a'));
        "#;
        let outcome = sandbox.run_pre(script, &HashMap::new()).await;
        assert_eq!(outcome.console, vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn test_no_network_call_means_no_transport_call() {
        let transport = Arc::new(StubTransport::new(200, "{}"));
        let sandbox = sandbox_with(transport.clone());

        let outcome = sandbox
            .run_pre("pm.environment.set('a', 'b');", &HashMap::new())
            .await;
        assert!(outcome.error.is_none());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_send_request_replays_with_real_response() {
        let transport = Arc::new(StubTransport::new(201, r#"{"token":"secret"}"#));
        let sandbox = sandbox_with(transport.clone());

        let script = r#"
            var r = pm.sendRequest({ url: 'http://upstream.test/token', method: 'POST' });
            pm.environment.set('status', r.status);
            pm.environment.set('token', r.json().token);
        "#;
        let outcome = sandbox.run_pre(script, &HashMap::new()).await;

        assert!(outcome.error.is_none());
        assert_eq!(transport.call_count(), 1);
        assert_eq!(outcome.updates.get("status").unwrap(), "201");
        assert_eq!(outcome.updates.get("token").unwrap(), "secret");
    }

    #[tokio::test]
    async fn test_probe_output_is_discarded_after_network_call() {
        let transport = Arc::new(StubTransport::new(201, "{}"));
        let sandbox = sandbox_with(transport.clone());

        // The probe run logs "status:0"; only the replay line survives.
        let script = r#"
            var r = pm.sendRequest({ url: 'http://upstream.test', method: 'GET' });
            console.log('status:' + r.status);
        "#;
        let outcome = sandbox.run_pre(script, &HashMap::new()).await;

        assert_eq!(outcome.console, vec!["status:201".to_string()]);
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_synthetic_response() {
        let sandbox = sandbox_with(Arc::new(RefusingTransport));

        let script = r#"
            var r = pm.sendRequest({ url: 'http://unreachable.test', method: 'GET' });
            pm.environment.set('status', r.status);
            pm.environment.set('body', r.text());
        "#;
        let outcome = sandbox.run_pre(script, &HashMap::new()).await;

        assert!(outcome.error.is_none());
        assert_eq!(outcome.updates.get("status").unwrap(), "0");
        assert!(outcome.updates.get("body").unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_thrown_error_is_fatal_with_no_partial_output() {
        let sandbox = sandbox_with(Arc::new(StubTransport::new(200, "{}")));

        let script = r#"
            console.log('before');
            pm.environment.set('a', 'b');
            throw new Error('boom');
        "#;
        let outcome = sandbox.run_pre(script, &HashMap::new()).await;

        let error = outcome.error.expect("evaluation should fail");
        assert!(error.contains("boom"), "unexpected error: {}", error);
        assert!(outcome.console.is_empty());
        assert!(outcome.updates.is_empty());
    }

    #[tokio::test]
    async fn test_syntax_error_is_fatal() {
        let sandbox = sandbox_with(Arc::new(StubTransport::new(200, "{}")));
        let outcome = sandbox.run_pre("this is ( not javascript", &HashMap::new()).await;
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn test_blank_script_is_a_noop() {
        let transport = Arc::new(StubTransport::new(200, "{}"));
        let sandbox = sandbox_with(transport.clone());

        let outcome = sandbox.run_pre("   \n  ", &HashMap::new()).await;
        assert!(outcome.error.is_none());
        assert!(outcome.console.is_empty());
        assert!(outcome.updates.is_empty());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_require_stub_warns_and_returns_empty() {
        let sandbox = sandbox_with(Arc::new(StubTransport::new(200, "{}")));
        let outcome = sandbox
            .run_pre("var lodash = pm.require('lodash');", &HashMap::new())
            .await;
        assert!(outcome.error.is_none());
        assert_eq!(outcome.console.len(), 1);
        assert!(outcome.console[0].contains("not supported"));
    }

    #[tokio::test]
    async fn test_top_level_await_is_stripped() {
        let transport = Arc::new(StubTransport::new(200, r#"{"ok":true}"#));
        let sandbox = sandbox_with(transport.clone());

        let script = r#"
            var r = await pm.sendRequest({ url: 'http://upstream.test', method: 'GET' });
            pm.environment.set('ok', r.json().ok);
        "#;
        let outcome = sandbox.run_pre(script, &HashMap::new()).await;

        assert!(outcome.error.is_none());
        assert_eq!(outcome.updates.get("ok").unwrap(), "true");
    }

    #[tokio::test]
    async fn test_post_script_sees_response() {
        let sandbox = sandbox_with(Arc::new(StubTransport::new(200, "{}")));
        let response = ResponseData {
            status: 404,
            headers: HashMap::new(),
            body_text: r#"{"error":"missing"}"#.to_string(),
            body_json: serde_json::from_str(r#"{"error":"missing"}"#).ok(),
            elapsed_ms: 3.0,
        };

        let script = r#"
            pm.environment.set('status', pm.response.status);
            pm.environment.set('code', pm.response.statusCode);
            pm.environment.set('error', pm.response.json().error);
            console.log(pm.response.text());
        "#;
        let outcome = sandbox.run_post(script, &HashMap::new(), &response).await;

        assert!(outcome.error.is_none());
        assert_eq!(outcome.updates.get("status").unwrap(), "404");
        assert_eq!(outcome.updates.get("code").unwrap(), "404");
        assert_eq!(outcome.updates.get("error").unwrap(), "missing");
        assert_eq!(outcome.console, vec![r#"{"error":"missing"}"#.to_string()]);
    }

    #[tokio::test]
    async fn test_pre_script_has_no_response() {
        let sandbox = sandbox_with(Arc::new(StubTransport::new(200, "{}")));
        let outcome = sandbox
            .run_pre("console.log(typeof pm.response);", &HashMap::new())
            .await;
        assert_eq!(outcome.console, vec!["undefined".to_string()]);
    }

    #[test]
    fn test_bridge_request_raw_body() {
        let captured: Value = serde_json::from_str(
            r#"{
                "url": "http://upstream.test/items",
                "method": "post",
                "header": [{"key": "Content-Type", "value": "application/json"}],
                "body": {"mode": "raw", "raw": "{\"a\":1}"}
            }"#,
        )
        .unwrap();

        let request = bridge_request(&captured);
        assert_eq!(request.method, HttpMethod::POST);
        assert_eq!(request.url, "http://upstream.test/items");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.body.unwrap(), br#"{"a":1}"#.to_vec());
    }

    #[test]
    fn test_bridge_request_urlencoded_skips_disabled_pairs() {
        let captured: Value = serde_json::from_str(
            r#"{
                "url": "http://upstream.test",
                "method": "POST",
                "body": {"mode": "urlencoded", "urlencoded": [
                    {"key": "a", "value": "1"},
                    {"key": "b", "value": "2", "disabled": true},
                    {"key": "c", "value": "3"}
                ]}
            }"#,
        )
        .unwrap();

        let request = bridge_request(&captured);
        assert_eq!(request.body.unwrap(), b"a=1&c=3".to_vec());
    }

    #[test]
    fn test_bridge_request_defaults() {
        let captured: Value = serde_json::from_str(r#"{"url": "http://x.test"}"#).unwrap();
        let request = bridge_request(&captured);
        assert_eq!(request.method, HttpMethod::GET);
        assert!(request.body.is_none());
        assert!(request.headers.is_empty());
    }
}
