//! Redb-backed index store.
//!
//! Uses [redb](https://github.com/cberner/redb) - a pure Rust, ACID-compliant,
//! embedded B-tree database. All access is local to the process; there are no
//! network calls.
//!
//! # Tables
//!
//! - `chunks`: chunk id (`{doc_id}-{start}-{end}`) -> Chunk (JSON)
//! - `vectors`: chunk id -> embedding (raw bytes, little-endian f32)
//! - `doc_meta`: document id -> metadata mapping (JSON)

use super::IndexStore;
use crate::error::StoreError;
use crate::types::{Chunk, DocumentMeta};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

const CHUNKS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("chunks");
const VECTORS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("vectors");
const DOC_META_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("doc_meta");

/// Redb-backed index store.
///
/// # Example
///
/// ```ignore
/// use document_rag::store::RedbIndexStore;
///
/// let store = RedbIndexStore::open("./data/index.redb")?;
/// store.put_chunk_with_vector(&chunk, &vector).await?;
/// ```
pub struct RedbIndexStore {
    db: Arc<Database>,
}

impl RedbIndexStore {
    /// Opens or creates a redb database at the given path.
    ///
    /// Creates the database file and all required tables if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Database(format!("Failed to create index directory: {}", e))
            })?;
        }

        let db = Database::create(path.as_ref())
            .map_err(|e| StoreError::Database(format!("Failed to open database: {}", e)))?;

        // Create tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(|e| {
                StoreError::Database(format!("Failed to begin write transaction: {}", e))
            })?;

            for table in [CHUNKS_TABLE, VECTORS_TABLE, DOC_META_TABLE] {
                write_txn.open_table(table).map_err(|e| {
                    StoreError::Database(format!("Failed to create table: {}", e))
                })?;
            }

            write_txn.commit().map_err(|e| {
                StoreError::Database(format!("Failed to commit table creation: {}", e))
            })?;
        }

        Ok(Self { db: Arc::new(db) })
    }

    /// Serializes a Chunk to JSON bytes.
    fn serialize_chunk(chunk: &Chunk) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(chunk)
            .map_err(|e| StoreError::Serialization(format!("Failed to serialize chunk: {}", e)))
    }

    /// Deserializes a Chunk from JSON bytes.
    fn deserialize_chunk(bytes: &[u8]) -> Result<Chunk, StoreError> {
        serde_json::from_slice(bytes)
            .map_err(|e| StoreError::Serialization(format!("Failed to deserialize chunk: {}", e)))
    }

    /// Serializes document metadata to JSON bytes.
    fn serialize_meta(meta: &DocumentMeta) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(meta)
            .map_err(|e| StoreError::Serialization(format!("Failed to serialize metadata: {}", e)))
    }

    /// Deserializes document metadata from JSON bytes.
    fn deserialize_meta(bytes: &[u8]) -> Result<DocumentMeta, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| {
            StoreError::Serialization(format!("Failed to deserialize metadata: {}", e))
        })
    }

    /// Serializes a vector to raw bytes.
    ///
    /// Format: Little-endian f32 values packed sequentially (4 bytes per
    /// value). Chosen over JSON because vectors dominate the stored data
    /// (384 dimensions * 4 bytes per chunk).
    ///
    /// NOTE: Endianness MUST match `deserialize_vector()`.
    fn serialize_vector(vector: &[f32]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(vector.len() * 4);
        for &value in vector {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// Deserializes a vector from raw bytes.
    fn deserialize_vector(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn put_raw(
        &self,
        table: TableDefinition<&str, &[u8]>,
        key: &str,
        bytes: &[u8],
    ) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(|e| {
            StoreError::Database(format!("Failed to begin write transaction: {}", e))
        })?;

        {
            let mut table = write_txn
                .open_table(table)
                .map_err(|e| StoreError::Database(format!("Failed to open table: {}", e)))?;

            table
                .insert(key, bytes)
                .map_err(|e| StoreError::Database(format!("Failed to insert record: {}", e)))?;
        }

        write_txn
            .commit()
            .map_err(|e| StoreError::Database(format!("Failed to commit record: {}", e)))?;

        Ok(())
    }

    /// Removes every key with the given prefix from a table. Returns the
    /// number of removed records.
    fn remove_prefixed(
        table: &mut redb::Table<'_, &'static str, &'static [u8]>,
        prefix: &str,
    ) -> Result<usize, StoreError> {
        let keys: Vec<String> = {
            let mut keys = Vec::new();
            let range = table
                .range(prefix..)
                .map_err(|e| StoreError::Database(format!("Failed to scan key range: {}", e)))?;
            for entry in range {
                let (key, _) = entry.map_err(|e| {
                    StoreError::Database(format!("Failed to read key range entry: {}", e))
                })?;
                let key = key.value();
                if !key.starts_with(prefix) {
                    break;
                }
                keys.push(key.to_string());
            }
            keys
        };

        for key in &keys {
            table
                .remove(key.as_str())
                .map_err(|e| StoreError::Database(format!("Failed to remove record: {}", e)))?;
        }

        Ok(keys.len())
    }
}

#[async_trait::async_trait]
impl IndexStore for RedbIndexStore {
    async fn put_chunk(&self, chunk: &Chunk) -> Result<(), StoreError> {
        let bytes = Self::serialize_chunk(chunk)?;
        self.put_raw(CHUNKS_TABLE, &chunk.id, &bytes)
    }

    async fn put_vector(&self, chunk_id: &str, vector: &[f32]) -> Result<(), StoreError> {
        let bytes = Self::serialize_vector(vector);
        self.put_raw(VECTORS_TABLE, chunk_id, &bytes)
    }

    async fn put_chunk_with_vector(
        &self,
        chunk: &Chunk,
        vector: &[f32],
    ) -> Result<(), StoreError> {
        let chunk_bytes = Self::serialize_chunk(chunk)?;
        let vector_bytes = Self::serialize_vector(vector);

        let write_txn = self.db.begin_write().map_err(|e| {
            StoreError::Database(format!("Failed to begin write transaction: {}", e))
        })?;

        {
            let mut chunks = write_txn
                .open_table(CHUNKS_TABLE)
                .map_err(|e| StoreError::Database(format!("Failed to open chunks table: {}", e)))?;
            chunks
                .insert(chunk.id.as_str(), chunk_bytes.as_slice())
                .map_err(|e| StoreError::Database(format!("Failed to insert chunk: {}", e)))?;

            let mut vectors = write_txn.open_table(VECTORS_TABLE).map_err(|e| {
                StoreError::Database(format!("Failed to open vectors table: {}", e))
            })?;
            vectors
                .insert(chunk.id.as_str(), vector_bytes.as_slice())
                .map_err(|e| StoreError::Database(format!("Failed to insert vector: {}", e)))?;
        }

        write_txn
            .commit()
            .map_err(|e| StoreError::Database(format!("Failed to commit chunk pair: {}", e)))?;

        Ok(())
    }

    async fn put_document_meta(
        &self,
        doc_id: &str,
        meta: &DocumentMeta,
    ) -> Result<(), StoreError> {
        let bytes = Self::serialize_meta(meta)?;
        self.put_raw(DOC_META_TABLE, doc_id, &bytes)
    }

    async fn get_document_meta(&self, doc_id: &str) -> Result<Option<DocumentMeta>, StoreError> {
        let read_txn = self.db.begin_read().map_err(|e| {
            StoreError::Database(format!("Failed to begin read transaction: {}", e))
        })?;

        let table = read_txn
            .open_table(DOC_META_TABLE)
            .map_err(|e| StoreError::Database(format!("Failed to open doc_meta table: {}", e)))?;

        match table.get(doc_id) {
            Ok(Some(guard)) => Ok(Some(Self::deserialize_meta(guard.value())?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Database(format!(
                "Failed to get metadata: {}",
                e
            ))),
        }
    }

    async fn list_chunks(&self, doc_id: &str) -> Result<Vec<Chunk>, StoreError> {
        let read_txn = self.db.begin_read().map_err(|e| {
            StoreError::Database(format!("Failed to begin read transaction: {}", e))
        })?;

        let table = read_txn
            .open_table(CHUNKS_TABLE)
            .map_err(|e| StoreError::Database(format!("Failed to open chunks table: {}", e)))?;

        let prefix = Chunk::document_prefix(doc_id);
        let mut chunks = Vec::new();
        let range = table
            .range(prefix.as_str()..)
            .map_err(|e| StoreError::Database(format!("Failed to scan chunks: {}", e)))?;
        for entry in range {
            let (key, value) = entry.map_err(|e| {
                StoreError::Database(format!("Failed to read chunk entry: {}", e))
            })?;
            if !key.value().starts_with(prefix.as_str()) {
                break;
            }
            let chunk = Self::deserialize_chunk(value.value())?;
            // The key prefix alone can collide across document ids; the
            // stored doc_id field is authoritative.
            if chunk.doc_id == doc_id {
                chunks.push(chunk);
            }
        }

        chunks.sort_by_key(|chunk| chunk.start);
        Ok(chunks)
    }

    async fn scan_all(&self) -> Result<Vec<(Chunk, Vec<f32>)>, StoreError> {
        let read_txn = self.db.begin_read().map_err(|e| {
            StoreError::Database(format!("Failed to begin read transaction: {}", e))
        })?;

        let chunks_table = read_txn
            .open_table(CHUNKS_TABLE)
            .map_err(|e| StoreError::Database(format!("Failed to open chunks table: {}", e)))?;
        let vectors_table = read_txn
            .open_table(VECTORS_TABLE)
            .map_err(|e| StoreError::Database(format!("Failed to open vectors table: {}", e)))?;

        let mut pairs = Vec::new();
        let iter = chunks_table
            .iter()
            .map_err(|e| StoreError::Database(format!("Failed to iterate chunks: {}", e)))?;
        for entry in iter {
            let (key, value) = entry.map_err(|e| {
                StoreError::Database(format!("Failed to read chunk entry: {}", e))
            })?;

            let chunk = match Self::deserialize_chunk(value.value()) {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!("skipping unreadable chunk record '{}': {}", key.value(), e);
                    continue;
                }
            };

            match vectors_table.get(key.value()) {
                Ok(Some(guard)) => pairs.push((chunk, Self::deserialize_vector(guard.value()))),
                // A chunk without a committed vector is not a valid pair yet.
                Ok(None) => debug!("chunk '{}' has no vector, skipping", key.value()),
                Err(e) => {
                    return Err(StoreError::Database(format!(
                        "Failed to get vector: {}",
                        e
                    )));
                }
            }
        }

        Ok(pairs)
    }

    async fn delete_document(&self, doc_id: &str) -> Result<(), StoreError> {
        let prefix = Chunk::document_prefix(doc_id);

        // One transaction covers chunks, vectors, and metadata, so a
        // concurrent scan sees all of the document's records or none.
        let write_txn = self.db.begin_write().map_err(|e| {
            StoreError::Database(format!("Failed to begin write transaction: {}", e))
        })?;

        let removed = {
            let mut chunks = write_txn
                .open_table(CHUNKS_TABLE)
                .map_err(|e| StoreError::Database(format!("Failed to open chunks table: {}", e)))?;
            let removed_chunks = Self::remove_prefixed(&mut chunks, &prefix)?;

            let mut vectors = write_txn.open_table(VECTORS_TABLE).map_err(|e| {
                StoreError::Database(format!("Failed to open vectors table: {}", e))
            })?;
            let removed_vectors = Self::remove_prefixed(&mut vectors, &prefix)?;

            let mut meta = write_txn.open_table(DOC_META_TABLE).map_err(|e| {
                StoreError::Database(format!("Failed to open doc_meta table: {}", e))
            })?;
            meta.remove(doc_id)
                .map_err(|e| StoreError::Database(format!("Failed to remove metadata: {}", e)))?;

            removed_chunks + removed_vectors
        };

        write_txn
            .commit()
            .map_err(|e| StoreError::Database(format!("Failed to commit deletion: {}", e)))?;

        debug!("deleted {} records for document '{}'", removed, doc_id);
        Ok(())
    }

    async fn chunk_count(&self) -> Result<usize, StoreError> {
        let read_txn = self.db.begin_read().map_err(|e| {
            StoreError::Database(format!("Failed to begin read transaction: {}", e))
        })?;

        let table = read_txn
            .open_table(CHUNKS_TABLE)
            .map_err(|e| StoreError::Database(format!("Failed to open chunks table: {}", e)))?;

        let count = table
            .len()
            .map_err(|e| StoreError::Database(format!("Failed to get chunk count: {}", e)))?;

        Ok(count as usize)
    }
}
