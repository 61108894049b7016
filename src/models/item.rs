//! Collection and item documents.
//!
//! A collection owns a tree of items. Folder items group requests and carry
//! their own script pair; request items additionally carry the full request
//! template. The `parent_id` links form the hierarchy walked by the script
//! chain resolver.

use crate::models::request::{HttpMethod, KeyValuePair, RequestBody};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether an item is a folder or a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Folder,
    Request,
}

/// A collection document: the root of an item hierarchy, with its own
/// pre/post script pair that wraps every request inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub pre_request_script: String,
    #[serde(default)]
    pub post_request_script: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Collection {
    /// Creates an empty collection with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            pre_request_script: String::new(),
            post_request_script: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// An item document: either a folder or a request inside a collection.
///
/// The request template fields (`method`, `url`, `params`, `headers`, `body`)
/// are meaningful only when `kind` is [`ItemKind::Request`]; folders keep
/// their serde defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub collection_id: String,
    /// Parent folder id, or `None` when the item sits directly under the collection.
    #[serde(default)]
    pub parent_id: Option<String>,
    pub kind: ItemKind,
    pub name: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub pre_request_script: String,
    #[serde(default)]
    pub post_request_script: String,

    // Request template fields.
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub params: Vec<KeyValuePair>,
    #[serde(default)]
    pub headers: Vec<KeyValuePair>,
    #[serde(default)]
    pub body: RequestBody,
}

impl Item {
    /// Creates a request item with a generated id and an empty template.
    pub fn request(collection_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::blank(collection_id, name, ItemKind::Request)
    }

    /// Creates a folder item with a generated id.
    pub fn folder(collection_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::blank(collection_id, name, ItemKind::Folder)
    }

    fn blank(collection_id: impl Into<String>, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            collection_id: collection_id.into(),
            parent_id: None,
            kind,
            name: name.into(),
            order: 0,
            pre_request_script: String::new(),
            post_request_script: String::new(),
            method: HttpMethod::GET,
            url: String::new(),
            params: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::default(),
        }
    }
}
