//! Script chain resolution.
//!
//! Builds the ordered list of pre/post script pairs that wrap one request:
//! the owning collection first, then each enclosing folder from outermost to
//! innermost, then the request itself — always last, even when its own
//! scripts are empty. The walk is tolerant of a broken hierarchy: a dangling
//! `parent_id` ends the walk silently with the partial chain collected so
//! far, and a visited-id set guards against cyclic parent links.

use crate::store::DocumentStore;
use std::collections::HashSet;

/// Hierarchy level a chain entry originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptLevel {
    Collection,
    Folder,
    Request,
}

impl ScriptLevel {
    /// Returns the tag used when prefixing console lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptLevel::Collection => "collection",
            ScriptLevel::Folder => "folder",
            ScriptLevel::Request => "request",
        }
    }
}

impl std::fmt::Display for ScriptLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One level's pre/post script pair, tagged with its hierarchy level.
///
/// Entries are produced fresh per run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptChainEntry {
    pub pre: String,
    pub post: String,
    pub level: ScriptLevel,
}

impl ScriptChainEntry {
    /// Whether the pre-script has any non-whitespace content.
    pub fn has_pre(&self) -> bool {
        !self.pre.trim().is_empty()
    }

    /// Whether the post-script has any non-whitespace content.
    pub fn has_post(&self) -> bool {
        !self.post.trim().is_empty()
    }
}

/// Resolves the ordered script chain for a request.
///
/// Returns `None` when the request itself cannot be found — callers must
/// treat that as a missing-request signal, distinct from a request with no
/// scripts configured (which still yields a chain with the request entry).
pub fn resolve_script_chain(
    store: &dyn DocumentStore,
    request_id: &str,
) -> Option<Vec<ScriptChainEntry>> {
    let item = store.get_item(request_id)?;

    let mut chain = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(item.id.clone());

    // Walk parent links upward, collecting folder entries innermost-first.
    let mut current = item.clone();
    while let Some(parent_id) = current.parent_id.clone() {
        if !visited.insert(parent_id.clone()) {
            log::warn!("cyclic parent link at item {}; stopping walk", parent_id);
            break;
        }
        match store.get_item(&parent_id) {
            Some(parent) => {
                chain.push(ScriptChainEntry {
                    pre: parent.pre_request_script.clone(),
                    post: parent.post_request_script.clone(),
                    level: ScriptLevel::Folder,
                });
                current = parent;
            }
            // Dangling link: keep what we have.
            None => break,
        }
    }

    if let Some(collection) = store.get_collection(&item.collection_id) {
        chain.push(ScriptChainEntry {
            pre: collection.pre_request_script,
            post: collection.post_request_script,
            level: ScriptLevel::Collection,
        });
    }

    // Outermost (collection) first, then folders outer to inner.
    chain.reverse();

    chain.push(ScriptChainEntry {
        pre: item.pre_request_script,
        post: item.post_request_script,
        level: ScriptLevel::Request,
    });

    Some(chain)
}
