//! Data models for stored documents, request templates, and responses.
//!
//! This module contains the core data structures used throughout the engine:
//! collection/folder/request documents, environment documents with their
//! variable records, and the response snapshot handed to post-request scripts.

pub mod environment;
pub mod item;
pub mod request;
pub mod response;

pub use environment::{Environment, Globals, VarValue};
pub use item::{Collection, Item, ItemKind};
pub use request::{BodyMode, HttpMethod, KeyValuePair, RequestBody};
pub use response::ResponseData;
