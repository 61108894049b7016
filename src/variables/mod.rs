//! Variable resolution for request execution.
//!
//! This module provides the three-tier variable scope (local, active
//! environment, globals), the single-pass `{{variable}}` substitution engine,
//! and the dotenv-style loader for the local tier.

pub mod local;
pub mod scope;
pub mod substitution;

pub use local::{load_local_vars, RESERVED_KEYS};
pub use scope::VariableScope;
pub use substitution::substitute;
