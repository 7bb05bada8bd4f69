//! Document store: the ordered, named set of documents.
//!
//! DESIGN
//! ======
//! The store persists an index of `(id, name)` entries under `INDEX_KEY`, in
//! the order documents were added. Each document's scene lives under its own
//! key and is owned by a `DocumentController` that the store opens lazily and
//! keeps until the document is removed. One store is created at startup and
//! passed to whatever needs it.
//!
//! ERROR HANDLING
//! ==============
//! A missing or corrupt index loads as an empty store. Write failures are
//! logged; the in-memory index stays authoritative until the next write.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::document::DocumentController;
use crate::fetch::ByteSource;
use crate::kv::{INDEX_KEY, KvStore, document_key};

/// Name given to documents added without one.
pub const DEFAULT_DOCUMENT_NAME: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub id: Uuid,
    pub name: String,
}

pub struct DocumentStore {
    kv: Arc<dyn KvStore>,
    source: Arc<dyn ByteSource>,
    default_emoji_size: i64,
    entries: Vec<DocumentEntry>,
    open: HashMap<Uuid, DocumentController>,
}

impl DocumentStore {
    /// Load the document index from `kv`.
    #[must_use]
    pub fn load(kv: Arc<dyn KvStore>, source: Arc<dyn ByteSource>, default_emoji_size: i64) -> Self {
        let entries = match kv.get(INDEX_KEY) {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<DocumentEntry>>(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(error = %e, "discarding unreadable document index");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                error!(error = %e, "document index read failed");
                Vec::new()
            }
        };
        info!(count = entries.len(), "document store loaded");
        Self { kv, source, default_emoji_size, entries, open: HashMap::new() }
    }

    /// Documents in the order they were added.
    #[must_use]
    pub fn list_documents(&self) -> &[DocumentEntry] {
        &self.entries
    }

    #[must_use]
    pub fn name(&self, id: Uuid) -> Option<&str> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.name.as_str())
    }

    /// Create a document with an empty persisted scene and return its live
    /// controller.
    ///
    /// Blank or absent names become "Untitled"; a name already in use gets
    /// the smallest free numeric suffix ("Untitled 2", "Untitled 3", ...).
    pub fn add_document(&mut self, name: Option<&str>) -> &mut DocumentController {
        let base = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(DEFAULT_DOCUMENT_NAME);
        let name = unique_name(base, &self.entries);
        let id = Uuid::new_v4();

        let doc = DocumentController::open(
            id,
            Arc::clone(&self.kv),
            Arc::clone(&self.source),
            self.default_emoji_size,
        );
        doc.save();

        info!(document = %id, %name, "document added");
        self.entries.push(DocumentEntry { id, name });
        self.save_index();
        self.open.entry(id).or_insert(doc)
    }

    /// Delete a document's snapshot and index entry.
    ///
    /// A live controller is retired and dropped; nothing it does afterwards
    /// reaches storage. Returns the removed entry, or `None` if `id` is unknown.
    pub fn remove_document(&mut self, id: Uuid) -> Option<DocumentEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        let entry = self.entries.remove(index);
        if let Some(mut doc) = self.open.remove(&id) {
            doc.retire();
        }

        let key = document_key(id);
        if let Err(e) = self.kv.delete(&key) {
            error!(error = %e, %key, "snapshot delete failed");
        }
        self.save_index();
        info!(document = %id, name = %entry.name, "document removed");
        Some(entry)
    }

    /// Change a document's display name. Returns false if `id` is unknown.
    pub fn rename(&mut self, id: Uuid, name: &str) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        entry.name = name.to_string();
        self.save_index();
        true
    }

    /// Live controller for an indexed document, opening it on first use.
    pub fn open_document(&mut self, id: Uuid) -> Option<&mut DocumentController> {
        if !self.entries.iter().any(|e| e.id == id) {
            return None;
        }
        let doc = self.open.entry(id).or_insert_with(|| {
            DocumentController::open(id, Arc::clone(&self.kv), Arc::clone(&self.source), self.default_emoji_size)
        });
        Some(doc)
    }

    /// Controller for a document that is already open.
    #[must_use]
    pub fn document(&self, id: Uuid) -> Option<&DocumentController> {
        self.open.get(&id)
    }

    pub fn document_mut(&mut self, id: Uuid) -> Option<&mut DocumentController> {
        self.open.get_mut(&id)
    }

    fn save_index(&self) {
        match serde_json::to_vec(&self.entries) {
            Ok(bytes) => {
                if let Err(e) = self.kv.set(INDEX_KEY, &bytes) {
                    error!(error = %e, "document index write failed");
                }
            }
            Err(e) => error!(error = %e, "document index encode failed"),
        }
    }
}

fn unique_name(base: &str, entries: &[DocumentEntry]) -> String {
    let taken = |candidate: &str| entries.iter().any(|e| e.name == candidate);
    if !taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base} {n}"))
        .find(|candidate| !taken(candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}
