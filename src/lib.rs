//! Script-augmented HTTP request execution engine.
//!
//! `restflow` executes stored HTTP request definitions the way an API-testing
//! client does: user scripts run before and after the network call, read and
//! write a three-tier variable scope (local over active environment over
//! globals), and may themselves trigger nested HTTP calls through a
//! synchronous-looking primitive bridged to the real transport by a two-phase
//! probe/replay protocol.
//!
//! The crate is organized around four components:
//!
//! - [`variables`] — tier merge and single-pass `{{key}}` substitution.
//! - [`chain`] — the ordered collection → folders → request script chain.
//! - [`sandbox`] — isolated script evaluation with the injected `pm`
//!   capability object.
//! - [`orchestrator`] — the nine-stage pipeline tying it all together.
//!
//! Persistence and transport are collaborators behind traits:
//! [`store::DocumentStore`] (with [`store::MemoryStore`] as the in-process
//! implementation) and [`transport::HttpTransport`] (with
//! [`transport::NativeTransport`] over reqwest).
//!
//! ```no_run
//! use restflow::orchestrator::{CancelToken, ExecutionOptions, RequestOrchestrator};
//! use restflow::store::MemoryStore;
//! use restflow::transport::NativeTransport;
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let store = Arc::new(MemoryStore::new());
//! let transport = Arc::new(NativeTransport::new());
//! let orchestrator = RequestOrchestrator::new(store, transport, ExecutionOptions::default());
//!
//! let result = orchestrator
//!     .execute_request("request-id", Some("env-id"), &CancelToken::new())
//!     .await;
//! for line in &result.console {
//!     println!("{}", line);
//! }
//! # }
//! ```

pub mod chain;
pub mod models;
pub mod orchestrator;
pub mod sandbox;
pub mod store;
pub mod transport;
pub mod variables;

pub use chain::{resolve_script_chain, ScriptChainEntry, ScriptLevel};
pub use models::{
    BodyMode, Collection, Environment, Globals, HttpMethod, Item, ItemKind, KeyValuePair,
    RequestBody, ResponseData, VarValue,
};
pub use orchestrator::{
    CancelToken, ExecutionOptions, ExecutionResult, PipelineError, RequestOrchestrator,
};
pub use sandbox::{ScriptOutcome, ScriptSandbox};
pub use store::{DocumentStore, MemoryStore};
pub use transport::{HttpTransport, NativeTransport, TransportError};
pub use variables::VariableScope;
