//! Local index persistence for chunks, vectors, and document metadata.
//!
//! Chunk and vector records share keys prefixed `{doc_id}-`, so a document's
//! full record set can be removed with a single prefix-scoped deletion.

mod redb_store;

pub use redb_store::RedbIndexStore;

use crate::error::StoreError;
use crate::types::{Chunk, DocumentMeta};
use std::sync::Arc;

/// Trait for index store operations
#[async_trait::async_trait]
pub trait IndexStore: Send + Sync {
    /// Idempotent upsert of a chunk record keyed by its id
    async fn put_chunk(&self, chunk: &Chunk) -> Result<(), StoreError>;

    /// Idempotent upsert of a vector keyed by chunk id
    async fn put_vector(&self, chunk_id: &str, vector: &[f32]) -> Result<(), StoreError>;

    /// Upsert a chunk and its vector in a single transaction
    async fn put_chunk_with_vector(&self, chunk: &Chunk, vector: &[f32])
    -> Result<(), StoreError>;

    /// Idempotent upsert of document-level metadata keyed by document id
    async fn put_document_meta(&self, doc_id: &str, meta: &DocumentMeta)
    -> Result<(), StoreError>;

    /// Metadata for a document, or `None` for an unknown id
    async fn get_document_meta(&self, doc_id: &str) -> Result<Option<DocumentMeta>, StoreError>;

    /// Chunks of one document, ordered by start offset
    async fn list_chunks(&self, doc_id: &str) -> Result<Vec<Chunk>, StoreError>;

    /// Every stored (chunk, vector) pair.
    ///
    /// Pairing is resilient: a chunk without a committed vector (or a vector
    /// without its chunk) is skipped. A scan concurrent with a build of the
    /// same document may observe a partially-indexed document; a scan
    /// concurrent with a deletion sees all of that document's records or
    /// none.
    async fn scan_all(&self) -> Result<Vec<(Chunk, Vec<f32>)>, StoreError>;

    /// Remove every chunk, vector, and metadata record of a document in one
    /// transaction. Unknown document ids are a no-op.
    async fn delete_document(&self, doc_id: &str) -> Result<(), StoreError>;

    /// Number of stored chunk records
    async fn chunk_count(&self) -> Result<usize, StoreError>;
}

/// Shared, injectable store handle
pub type SharedStore = Arc<dyn IndexStore>;
