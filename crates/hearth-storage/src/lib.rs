//! Storage abstraction for hearth.
//!
//! Backend crates (e.g., hearth-store-memory, hearth-store-sqlite) implement this
//! trait so `hearth-core` doesn't depend on any specific database engine or
//! schema details. The contract is deliberately narrow: the engine only ever
//! needs a point lookup, a single-match indexed lookup, a conditional update,
//! and an insert with uniqueness.

use thiserror::Error;

/// A stored document: a flat map of named fields to JSON values.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("precondition failed")]
    PreconditionFailed,
    #[error("ambiguous index match on {0}")]
    AmbiguousIndex(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The collections the engine reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Invitations,
    Properties,
    Identities,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Invitations => "invitations",
            Collection::Properties => "properties",
            Collection::Identities => "identities",
        }
    }

    /// Secondary field that must be unique across the collection, if any.
    /// Backends enforce this on `create` alongside key uniqueness.
    pub fn unique_index(&self) -> Option<&'static str> {
        match self {
            Collection::Invitations => Some("code_short"),
            _ => None,
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The storage trait `hearth-core` depends on.
///
/// `conditional_update` is the linearization point for every state transition
/// in the engine: it must compare `expected` against the live document and
/// apply `changes` atomically with respect to all other writers of the same
/// key. Backends without a native compare-and-set must serialize updates per
/// key themselves.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document under `key`. Fails with [`StoreError::AlreadyExists`]
    /// if the key, or any value of the collection's unique index, is taken.
    async fn create(
        &self,
        collection: Collection,
        key: &str,
        document: Document,
    ) -> Result<(), StoreError>;

    /// Point lookup by document key.
    async fn get_by_key(&self, collection: Collection, key: &str)
        -> Result<Document, StoreError>;

    /// Lookup by a secondary field. Returns at most one match; more than one
    /// is reported as [`StoreError::AmbiguousIndex`], never resolved silently.
    async fn get_by_indexed_field(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> Result<Document, StoreError>;

    /// Compare-and-set on a single document. Every field in `expected` must
    /// equal the live value for the write to commit; a field absent from the
    /// document compares equal to JSON null. On success the fields in
    /// `changes` are merged into the document. A mismatch is reported as
    /// [`StoreError::PreconditionFailed`] and leaves the document untouched.
    /// An empty `expected` map makes the update unconditional.
    async fn conditional_update(
        &self,
        collection: Collection,
        key: &str,
        expected: &Document,
        changes: &Document,
    ) -> Result<(), StoreError>;
}
