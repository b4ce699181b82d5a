//! In-memory document store backed by a concurrent map.
//!
//! This implementation is suitable for:
//! - Single server deployments
//! - Development and testing
//!
//! Updates to a single document are atomic: `conditional_update` compares and
//! mutates while holding the map entry's exclusive guard, so concurrent
//! writers of the same key observe a total order. For multi-replica
//! deployments, use a shared backend such as hearth-store-sqlite instead.

use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hearth_storage::{Collection, Document, DocumentStore, StoreError};

pub struct MemoryStore {
    docs: DashMap<(Collection, String), Document>,
    // Serializes inserts so the unique-index scan and the insert are one step.
    create_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            docs: DashMap::new(),
            create_lock: Mutex::new(()),
        }
    }

    fn index_matches(&self, collection: Collection, field: &str, value: &str) -> usize {
        self.docs
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .filter(|entry| {
                entry
                    .value()
                    .get(field)
                    .and_then(|v| v.as_str())
                    .is_some_and(|v| v == value)
            })
            .count()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(
        &self,
        collection: Collection,
        key: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        let _guard = self
            .create_lock
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if let Some(field) = collection.unique_index() {
            if let Some(value) = document.get(field).and_then(|v| v.as_str()) {
                if self.index_matches(collection, field, value) > 0 {
                    return Err(StoreError::AlreadyExists);
                }
            }
        }

        match self.docs.entry((collection, key.to_string())) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(document);
                Ok(())
            }
        }
    }

    async fn get_by_key(
        &self,
        collection: Collection,
        key: &str,
    ) -> Result<Document, StoreError> {
        self.docs
            .get(&(collection, key.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_indexed_field(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Document, StoreError> {
        let mut matches = self
            .docs
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .filter(|entry| {
                entry
                    .value()
                    .get(field)
                    .and_then(|v| v.as_str())
                    .is_some_and(|v| v == value)
            })
            .map(|entry| entry.value().clone());

        let first = matches.next().ok_or(StoreError::NotFound)?;
        if matches.next().is_some() {
            return Err(StoreError::AmbiguousIndex(field.to_string()));
        }
        Ok(first)
    }

    async fn conditional_update(
        &self,
        collection: Collection,
        key: &str,
        expected: &Document,
        changes: &Document,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .docs
            .get_mut(&(collection, key.to_string()))
            .ok_or(StoreError::NotFound)?;

        let doc = entry.value_mut();
        for (field, want) in expected {
            // An absent field compares equal to null.
            if doc.get(field).unwrap_or(&serde_json::Value::Null) != want {
                return Err(StoreError::PreconditionFailed);
            }
        }
        for (field, value) in changes {
            doc.insert(field.clone(), value.clone());
        }
        Ok(())
    }
}
