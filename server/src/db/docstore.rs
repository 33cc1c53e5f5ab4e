//! Document storage operations.
//!
//! Collections are ordered document lists; a collection springs into
//! existence on first write. Every mutating operation returns the
//! post-mutation snapshot of the whole collection so the caller can push
//! it to realtime subscribers.

use dashmap::DashMap;
use serde_json::Value;
use tether_store::Document;
use thiserror::Error;

/// Errors from document store operations.
#[derive(Debug, Error)]
pub enum DocError {
    #[error("document '{id}' not found in collection '{collection}'")]
    NotFound { collection: String, id: String },

    #[error("patch must be a JSON object, got {0}")]
    InvalidPatch(String),
}

/// Result type for document store operations.
pub type DocResult<T> = std::result::Result<T, DocError>;

/// Thread-safe in-memory store of named document collections.
#[derive(Debug, Default)]
pub struct DocStore {
    collections: DashMap<String, Vec<Document>>,
}

impl DocStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All documents of a collection, in insertion order. Unknown
    /// collections read as empty.
    pub fn list(&self, collection: &str) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|documents| documents.clone())
            .unwrap_or_default()
    }

    /// Get one document by id.
    pub fn get(&self, collection: &str, id: &str) -> Option<Document> {
        self.collections
            .get(collection)?
            .iter()
            .find(|doc| doc.id == id)
            .cloned()
    }

    /// Append a document with a server-assigned id.
    ///
    /// Returns the new id and the post-mutation snapshot.
    pub fn add(&self, collection: &str, data: Value) -> (String, Vec<Document>) {
        let id = uuid::Uuid::new_v4().to_string();
        let mut documents = self.collections.entry(collection.to_string()).or_default();
        documents.push(Document::new(id.clone(), data));
        (id, documents.clone())
    }

    /// Merge fields into an existing document.
    pub fn update(&self, collection: &str, id: &str, patch: Value) -> DocResult<Vec<Document>> {
        let fields = match patch {
            Value::Object(fields) => fields,
            other => return Err(DocError::InvalidPatch(other.to_string())),
        };

        let mut documents =
            self.collections
                .get_mut(collection)
                .ok_or_else(|| DocError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
        let document = documents
            .iter_mut()
            .find(|doc| doc.id == id)
            .ok_or_else(|| DocError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        match document.data.as_object_mut() {
            Some(object) => {
                for (key, value) in fields {
                    object.insert(key, value);
                }
            }
            None => document.data = Value::Object(fields),
        }

        Ok(documents.clone())
    }

    /// Create or fully replace a document at a known id.
    pub fn set(&self, collection: &str, id: &str, data: Value) -> Vec<Document> {
        let mut documents = self.collections.entry(collection.to_string()).or_default();
        match documents.iter_mut().find(|doc| doc.id == id) {
            Some(document) => document.data = data,
            None => documents.push(Document::new(id, data)),
        }
        documents.clone()
    }

    /// Remove a document.
    pub fn remove(&self, collection: &str, id: &str) -> DocResult<Vec<Document>> {
        let mut documents =
            self.collections
                .get_mut(collection)
                .ok_or_else(|| DocError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
        let before = documents.len();
        documents.retain(|doc| doc.id != id);
        if documents.len() == before {
            return Err(DocError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(documents.clone())
    }

    /// Names of all known collections.
    pub fn collection_names(&self) -> Vec<String> {
        self.collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }
}
