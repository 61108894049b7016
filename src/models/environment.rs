//! Environment and globals documents.
//!
//! Environments hold the *active* variable tier; the globals document holds
//! the lowest-precedence tier. Both map keys to [`VarValue`] entries, which
//! may be plain strings or `{value, enabled}` records. Disabled records are
//! invisible to variable resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A single variable entry inside an environment or globals document.
///
/// Script writes are always persisted as enabled records; plain strings exist
/// for hand-edited documents and imported data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    /// A `{value, enabled}` record. A missing `enabled` field means enabled.
    Record {
        value: String,
        #[serde(default = "default_enabled")]
        enabled: bool,
    },
    /// A bare string value, always enabled.
    Plain(String),
}

fn default_enabled() -> bool {
    true
}

impl VarValue {
    /// Creates an enabled `{value, enabled}` record.
    pub fn record(value: impl Into<String>) -> Self {
        VarValue::Record {
            value: value.into(),
            enabled: true,
        }
    }

    /// Creates a disabled record.
    pub fn disabled(value: impl Into<String>) -> Self {
        VarValue::Record {
            value: value.into(),
            enabled: false,
        }
    }

    /// Returns the string value regardless of the enabled flag.
    pub fn value(&self) -> &str {
        match self {
            VarValue::Record { value, .. } => value,
            VarValue::Plain(value) => value,
        }
    }

    /// Whether this entry participates in variable resolution.
    pub fn is_enabled(&self) -> bool {
        match self {
            VarValue::Record { enabled, .. } => *enabled,
            VarValue::Plain(_) => true,
        }
    }
}

impl From<&str> for VarValue {
    fn from(value: &str) -> Self {
        VarValue::Plain(value.to_string())
    }
}

/// An environment document: a named set of variable values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub values: BTreeMap<String, VarValue>,
    pub updated_at: DateTime<Utc>,
}

impl Environment {
    /// Creates an empty environment with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            values: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Sets a value, replacing any existing entry for the key.
    pub fn set(&mut self, key: impl Into<String>, value: VarValue) {
        self.values.insert(key.into(), value);
    }
}

/// The globals document. There is exactly one per store, with a fixed id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Globals {
    #[serde(default)]
    pub values: BTreeMap<String, VarValue>,
}

impl Globals {
    /// Sets a value, replacing any existing entry for the key.
    pub fn set(&mut self, key: impl Into<String>, value: VarValue) {
        self.values.insert(key.into(), value);
    }
}
