//! The request execution pipeline.
//!
//! One call to [`RequestOrchestrator::execute_request`] drives nine stages:
//! resolve the script chain, build the variable scope, run pre-scripts,
//! fold their writes, resolve the request template, dispatch, run
//! post-scripts, persist accumulated writes, and return the result. A
//! pre-script failure aborts before dispatch; a transport failure never
//! aborts (it becomes a synthetic status-0 response); a post-script failure
//! is logged to the console and skipped.

pub mod cancellation;
pub mod config;

pub use cancellation::CancelToken;
pub use config::ExecutionOptions;

use crate::chain::{resolve_script_chain, ScriptLevel};
use crate::models::{BodyMode, Item, ResponseData, VarValue};
use crate::sandbox::ScriptSandbox;
use crate::store::DocumentStore;
use crate::transport::{HttpTransport, TransportRequest};
use crate::variables::VariableScope;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Fatal pipeline outcome. Carried in [`ExecutionResult::error`], never
/// raised out of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A pre-request script failed; the run aborted before dispatch.
    Script(String),
    /// The target request does not exist in the store.
    ItemNotFound(String),
    /// Cancellation was observed at a stage boundary.
    Cancelled,
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Script(message) => write!(f, "script error: {}", message),
            PipelineError::ItemNotFound(id) => write!(f, "item not found: {}", id),
            PipelineError::Cancelled => write!(f, "run cancelled"),
        }
    }
}

impl std::error::Error for PipelineError {}

/// The outcome of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// The dispatched response. `None` when the run aborted before dispatch.
    pub response: Option<ResponseData>,

    /// Ordered console lines, each prefixed with its chain level tag.
    pub console: Vec<String>,

    /// Fatal error, if the run did not complete normally.
    pub error: Option<PipelineError>,
}

impl ExecutionResult {
    fn failed(error: PipelineError, console: Vec<String>) -> Self {
        Self {
            response: None,
            console,
            error: Some(error),
        }
    }
}

/// Pipeline progress marker, tracked for trace logging. `Aborted` and `Done`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Idle,
    ChainResolved,
    RunningPreScripts,
    Aborted,
    ScopeResolved,
    Dispatching,
    Dispatched,
    RunningPostScripts,
    Persisting,
    Done,
}

fn advance(request_id: &str, from: PipelineState, to: PipelineState) -> PipelineState {
    log::debug!("run {}: {:?} -> {:?}", request_id, from, to);
    to
}

/// Drives the nine-stage execution pipeline for stored requests.
pub struct RequestOrchestrator {
    store: Arc<dyn DocumentStore>,
    transport: Arc<dyn HttpTransport>,
    options: ExecutionOptions,
}

impl RequestOrchestrator {
    /// Creates an orchestrator over a document store and an HTTP transport.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        transport: Arc<dyn HttpTransport>,
        options: ExecutionOptions,
    ) -> Self {
        Self {
            store,
            transport,
            options,
        }
    }

    /// Executes one stored request end to end.
    ///
    /// `environment_id` selects the active environment tier; `None` runs
    /// without one, in which case script writes are not persisted. The cancel
    /// token is checked at stage boundaries only.
    ///
    /// Never returns an `Err`-like panic path: every failure mode lands in
    /// [`ExecutionResult::error`].
    pub async fn execute_request(
        &self,
        request_id: &str,
        environment_id: Option<&str>,
        cancel: &CancelToken,
    ) -> ExecutionResult {
        let mut state = PipelineState::Idle;
        let mut console: Vec<String> = Vec::new();

        // Stage 1: chain resolution. A missing request aborts before any
        // script runs.
        let item = match self.store.get_item(request_id) {
            Some(item) => item,
            None => {
                return ExecutionResult::failed(
                    PipelineError::ItemNotFound(request_id.to_string()),
                    console,
                )
            }
        };
        let chain = match resolve_script_chain(self.store.as_ref(), request_id) {
            Some(chain) => chain,
            None => {
                return ExecutionResult::failed(
                    PipelineError::ItemNotFound(request_id.to_string()),
                    console,
                )
            }
        };
        state = advance(request_id, state, PipelineState::ChainResolved);

        if cancel.is_cancelled() {
            return ExecutionResult::failed(PipelineError::Cancelled, console);
        }

        // Stage 2: initial scope. The flat snapshot handed to scripts tracks
        // every write, including keys that never gain a home in a tier.
        let active = environment_id
            .and_then(|id| self.store.get_environment(id))
            .map(|env| env.values)
            .unwrap_or_default();
        let global = self.store.get_globals().values;
        let mut scope =
            VariableScope::new(self.options.local_vars.clone(), active, global);
        let mut current_vars: HashMap<String, String> = scope.flatten();
        let mut pending_updates: BTreeMap<String, String> = BTreeMap::new();

        let sandbox = ScriptSandbox::new(self.transport.clone(), self.options.transport_options());

        // Stage 3: pre-scripts, outer to inner. First fatal error aborts the
        // run before dispatch.
        state = advance(request_id, state, PipelineState::RunningPreScripts);
        for entry in &chain {
            if !entry.has_pre() {
                continue;
            }
            let outcome = sandbox.run_pre(&entry.pre, &current_vars).await;
            if let Some(message) = outcome.error {
                console.push(format!("[{}][ERROR] {}", entry.level, message));
                advance(request_id, state, PipelineState::Aborted);
                return ExecutionResult::failed(PipelineError::Script(message), console);
            }
            tag_lines(&mut console, entry.level, outcome.console);
            for (key, value) in outcome.updates {
                current_vars.insert(key.clone(), value.clone());
                pending_updates.insert(key, value);
            }
        }

        if cancel.is_cancelled() {
            return ExecutionResult::failed(PipelineError::Cancelled, console);
        }

        // Stage 4: fold accumulated writes into their home tiers. Keys with
        // no prior home stay out of the substitution scope but are kept in
        // `pending_updates` for stage 8.
        scope.fold_updates(&pending_updates);
        state = advance(request_id, state, PipelineState::ScopeResolved);

        // Stage 5: resolve the request template against the tiered scope.
        let resolved = resolve_template(&item, &scope);

        // Stage 6: dispatch. Transport failures become a synthetic response;
        // the pipeline always reaches the post-scripts.
        state = advance(request_id, state, PipelineState::Dispatching);
        let response = match self
            .transport
            .send(&resolved, &self.options.transport_options())
            .await
        {
            Ok(response) => response.into_response_data(),
            Err(err) => {
                log::warn!("dispatch failed for {}: {}", request_id, err);
                ResponseData::synthetic(err.to_string())
            }
        };
        state = advance(request_id, state, PipelineState::Dispatched);

        if cancel.is_cancelled() {
            return ExecutionResult::failed(PipelineError::Cancelled, console);
        }

        // Stage 7: post-scripts, same outer-to-inner order. Failures are
        // logged and skipped; the response survives regardless.
        state = advance(request_id, state, PipelineState::RunningPostScripts);
        for entry in &chain {
            if !entry.has_post() {
                continue;
            }
            let outcome = sandbox.run_post(&entry.post, &current_vars, &response).await;
            if let Some(message) = outcome.error {
                console.push(format!("[{}][ERROR] {}", entry.level, message));
                continue;
            }
            tag_lines(&mut console, entry.level, outcome.console);
            scope.fold_updates(&outcome.updates);
            for (key, value) in outcome.updates {
                current_vars.insert(key.clone(), value.clone());
                pending_updates.insert(key, value);
            }
        }

        if cancel.is_cancelled() {
            return ExecutionResult::failed(PipelineError::Cancelled, console);
        }

        // Stage 8: persist all accumulated writes into the active
        // environment. Without a selected environment, writes are dropped.
        state = advance(request_id, state, PipelineState::Persisting);
        if !pending_updates.is_empty() {
            if let Some(env_id) = environment_id {
                if let Some(environment) = self.store.get_environment(env_id) {
                    let mut values = environment.values;
                    for (key, value) in &pending_updates {
                        values.insert(key.clone(), VarValue::record(value));
                    }
                    self.store.update_environment(env_id, values);
                    log::debug!(
                        "persisted {} variable write(s) to environment {}",
                        pending_updates.len(),
                        env_id
                    );
                } else {
                    log::warn!("active environment {} vanished; writes dropped", env_id);
                }
            }
        }

        // Stage 9: done.
        advance(request_id, state, PipelineState::Done);
        ExecutionResult {
            response: Some(response),
            console,
            error: None,
        }
    }
}

fn tag_lines(console: &mut Vec<String>, level: ScriptLevel, lines: Vec<String>) {
    for line in lines {
        console.push(format!("[{}] {}", level, line));
    }
}

/// Resolves an item's request template into a dispatchable transport request.
///
/// Every text field is substituted against the tiered scope; disabled
/// parameters and headers are dropped entirely. When the body is non-empty
/// and no `Content-Type` header is set, a default matching the body mode is
/// injected.
fn resolve_template(item: &Item, scope: &VariableScope) -> TransportRequest {
    let url = scope.substitute(&item.url);

    let query: Vec<(String, String)> = item
        .params
        .iter()
        .filter(|pair| pair.enabled)
        .map(|pair| (scope.substitute(&pair.key), scope.substitute(&pair.value)))
        .collect();

    let mut headers: Vec<(String, String)> = item
        .headers
        .iter()
        .filter(|pair| pair.enabled)
        .map(|pair| (scope.substitute(&pair.key), scope.substitute(&pair.value)))
        .collect();

    let (body, default_content_type) = match item.body.mode {
        BodyMode::None => (None, None),
        BodyMode::Raw => (
            Some(scope.substitute(&item.body.raw).into_bytes()),
            Some("application/json"),
        ),
        BodyMode::Urlencoded => {
            let encoded = item
                .body
                .urlencoded
                .iter()
                .filter(|pair| pair.enabled)
                .map(|pair| {
                    format!(
                        "{}={}",
                        scope.substitute(&pair.key),
                        scope.substitute(&pair.value)
                    )
                })
                .collect::<Vec<_>>()
                .join("&");
            (
                Some(encoded.into_bytes()),
                Some("application/x-www-form-urlencoded"),
            )
        }
    };

    if let Some(content_type) = default_content_type {
        let has_content_type = headers
            .iter()
            .any(|(key, _)| key.eq_ignore_ascii_case("content-type"));
        if !has_content_type {
            headers.push(("Content-Type".to_string(), content_type.to_string()));
        }
    }

    TransportRequest {
        method: item.method,
        url,
        query,
        headers,
        body,
    }
}
