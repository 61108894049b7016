//! The three-tier variable scope.
//!
//! A scope merges three tiers for one pipeline run: *local* (static
//! deployment configuration, highest precedence), *active* (the selected
//! environment's values), and *global* (lowest precedence). Script writes are
//! folded back through [`VariableScope::fold_updates`], which only touches
//! keys that already have a home in the active or global tier; substitution
//! itself never mutates any tier.

use crate::models::VarValue;
use crate::variables::substitution::substitute;
use std::collections::{BTreeMap, HashMap};

/// The layered variable scope for a single pipeline run.
#[derive(Debug, Clone, Default)]
pub struct VariableScope {
    /// Static configuration values. Never mutated during a run.
    local: HashMap<String, String>,

    /// Values of the currently selected environment, if any.
    active: BTreeMap<String, VarValue>,

    /// Values of the globals document.
    global: BTreeMap<String, VarValue>,
}

impl VariableScope {
    /// Builds a scope from the three tiers.
    pub fn new(
        local: HashMap<String, String>,
        active: BTreeMap<String, VarValue>,
        global: BTreeMap<String, VarValue>,
    ) -> Self {
        Self {
            local,
            active,
            global,
        }
    }

    /// Flattens the tiers into a single `key -> string` map.
    ///
    /// Local wins over active, active wins over global. Disabled
    /// `{enabled: false}` records are excluded entirely rather than merely
    /// hidden: a disabled entry in a higher tier does not shadow an enabled
    /// one below it.
    pub fn flatten(&self) -> HashMap<String, String> {
        let mut merged = HashMap::new();
        for (key, value) in &self.global {
            if value.is_enabled() {
                merged.insert(key.clone(), value.value().to_string());
            }
        }
        for (key, value) in &self.active {
            if value.is_enabled() {
                merged.insert(key.clone(), value.value().to_string());
            }
        }
        for (key, value) in &self.local {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Substitutes `{{key}}` tokens in `text` against the flattened scope.
    pub fn substitute(&self, text: &str) -> String {
        substitute(text, &self.flatten())
    }

    /// Folds script writes into the tier the key already belongs to.
    ///
    /// A key present in the active tier is overwritten there; otherwise, a
    /// key present in the global tier is overwritten there. Keys shadowed by
    /// the local tier are skipped (local is static and wins regardless), and
    /// keys with no prior home in any tier are deliberately not added: they
    /// stay outside the substitution scope for the rest of the run even
    /// though the orchestrator still records them for final persistence.
    pub fn fold_updates(&mut self, updates: &BTreeMap<String, String>) {
        for (key, value) in updates {
            if self.local.contains_key(key) {
                continue;
            }
            if self.active.contains_key(key) {
                self.active.insert(key.clone(), VarValue::record(value));
            } else if self.global.contains_key(key) {
                self.global.insert(key.clone(), VarValue::record(value));
            }
        }
    }
}
